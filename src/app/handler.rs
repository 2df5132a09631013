//! Handler utilities for resources, tools and prompts

use std::future::Future;
use std::sync::Arc;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::error::{Error, ErrorCode};
use crate::app::context::Context;
use crate::types::{IntoResponse, Response, Request, RequestId};

/// Represents a specific registered handler
pub(crate) type RequestHandler<T> = Arc<
    dyn Handler<T>
    + Send
    + Sync
>;

/// The payload a registered handler is invoked with
#[derive(Debug)]
pub enum HandlerParams {
    /// A full request together with its per-call context
    Request(Context, Request),
}

/// Represents a Request -> Response handler
pub trait Handler<T> {
    /// Invokes the handler
    fn call(&self, params: HandlerParams) -> BoxFuture<'_, Result<T, Error>>;
}

/// Represents an extractor trait from handler parameters
pub trait FromHandlerParams: Sized {
    /// Extracts `Self` from the handler parameters
    fn from_params(params: &HandlerParams) -> Result<Self, Error>;
}

/// Represents a generic handler
pub trait GenericHandler<Args>: Clone + Send + Sync + 'static {
    /// Output type
    type Output;
    /// Output future
    type Future: Future<Output = Self::Output> + Send;

    /// Calls the handler
    fn call(&self, args: Args) -> Self::Future;
}

pub(crate) struct RequestFunc<F, R, Args>
where
    F: GenericHandler<Args, Output = R>,
    R: IntoResponse,
    Args: FromHandlerParams,
{
    func: F,
    _marker: std::marker::PhantomData<Args>,
}

impl<F, R, Args> RequestFunc<F, R, Args>
where
    F: GenericHandler<Args, Output = R>,
    R: IntoResponse,
    Args: FromHandlerParams
{
    pub(crate) fn new(func: F) -> Arc<Self> {
        let func = Self { func, _marker: std::marker::PhantomData };
        Arc::new(func)
    }
}

impl<F, R, Args> Handler<Response> for RequestFunc<F, R, Args>
where
    F: GenericHandler<Args, Output = R>,
    R: IntoResponse,
    Args: FromHandlerParams + Send + Sync
{
    #[inline]
    fn call(&self, params: HandlerParams) -> BoxFuture<'_, Result<Response, Error>> {
        Box::pin(async move {
            let id = RequestId::from_params(&params)?;
            let args = Args::from_params(&params)?;
            Ok(self.func
                .call(args)
                .await
                .into_response(id))
        })
    }
}

impl FromHandlerParams for () {
    fn from_params(_: &HandlerParams) -> Result<Self, Error> {
        Ok(())
    }
}

impl FromHandlerParams for RequestId {
    fn from_params(params: &HandlerParams) -> Result<Self, Error> {
        let req = Request::from_params(params)?;
        Ok(req.id())
    }
}

impl FromHandlerParams for Context {
    #[inline]
    fn from_params(params: &HandlerParams) -> Result<Self, Error> {
        let HandlerParams::Request(context, _) = params;
        Ok(context.clone())
    }
}

impl FromHandlerParams for Request {
    #[inline]
    fn from_params(params: &HandlerParams) -> Result<Self, Error> {
        let HandlerParams::Request(_, req) = params;
        Ok(req.clone())
    }
}

macro_rules! impl_from_handler_params {
    ($($T: ident),*) => {
        impl<$($T: FromHandlerParams),+> FromHandlerParams for ($($T,)+) {
            #[inline]
            fn from_params(params: &HandlerParams) -> Result<Self, Error> {
                let args = ($(
                    $T::from_params(params)?,
                )*);
                Ok(args)
            }
        }
    };
}

impl_from_handler_params! { T1 }
impl_from_handler_params! { T1, T2 }
impl_from_handler_params! { T1, T2, T3 }

macro_rules! impl_generic_handler ({ $($param:ident)* } => {
    impl<Func, Fut: Send, $($param,)*> GenericHandler<($($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future + 'static,
    {
        type Output = Fut::Output;
        type Future = Fut;

        #[inline]
        #[allow(non_snake_case)]
        fn call(&self, ($($param,)*): ($($param,)*)) -> Self::Future {
            (self)($($param,)*)
        }
    }
});

impl_generic_handler! {}
impl_generic_handler! { T1 }
impl_generic_handler! { T1 T2 }
impl_generic_handler! { T1 T2 T3 }
impl_generic_handler! { T1 T2 T3 T4 }
impl_generic_handler! { T1 T2 T3 T4 T5 }

/// Values bound to a component's declared parameter list, in declaration
/// order, together with the per-call [`Context`]
#[derive(Debug)]
pub struct Arguments {
    values: std::vec::IntoIter<Value>,
    ctx: Context,
}

impl Arguments {
    /// Creates a new [`Arguments`] from bound values and a call context
    pub(crate) fn new(values: Vec<Value>, ctx: Context) -> Self {
        Self { values: values.into_iter(), ctx }
    }
}

/// A single extractable handler argument
pub trait HandlerArg: Sized {
    /// Extracts `Self` from the bound arguments
    fn extract(args: &mut Arguments) -> Result<Self, Error>;
}

impl<T: DeserializeOwned> HandlerArg for T {
    #[inline]
    fn extract(args: &mut Arguments) -> Result<Self, Error> {
        let value = args.values
            .next()
            .ok_or_else(|| Error::new(ErrorCode::InvalidParams, "Missing argument value"))?;
        serde_json::from_value(value)
            .map_err(|err| Error::new(ErrorCode::InvalidParams, err.to_string()))
    }
}

impl HandlerArg for Context {
    #[inline]
    fn extract(args: &mut Arguments) -> Result<Self, Error> {
        Ok(args.ctx.clone())
    }
}

/// A handler invoked with bound arguments rather than a raw request
pub trait ArgsHandler<T> {
    /// Invokes the handler
    fn call(&self, args: Arguments) -> BoxFuture<'_, Result<T, Error>>;
}

/// Represents a registered bound-arguments handler
pub(crate) type BoundHandler<T> = Arc<
    dyn ArgsHandler<T>
    + Send
    + Sync
>;

/// A full argument tuple extractable from [`Arguments`]
pub trait FromArguments: Sized {
    /// Extracts the tuple from the bound arguments
    fn from_args(args: Arguments) -> Result<Self, Error>;
}

impl FromArguments for () {
    #[inline]
    fn from_args(_: Arguments) -> Result<Self, Error> {
        Ok(())
    }
}

macro_rules! impl_from_arguments ({ $($param:ident)* } => {
    impl<$($param: HandlerArg,)*> FromArguments for ($($param,)*) {
        #[inline]
        #[allow(non_snake_case)]
        fn from_args(mut args: Arguments) -> Result<Self, Error> {
            $(let $param = $param::extract(&mut args)?;)*
            Ok(($($param,)*))
        }
    }
});

impl_from_arguments! { T1 }
impl_from_arguments! { T1 T2 }
impl_from_arguments! { T1 T2 T3 }
impl_from_arguments! { T1 T2 T3 T4 }
impl_from_arguments! { T1 T2 T3 T4 T5 }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::Context;

    #[test]
    fn it_extracts_typed_values_in_order() {
        let ctx = Context::test();
        let args = Arguments::new(
            vec![Value::from("hi"), Value::from(2)],
            ctx);

        let (text, count): (String, i64) = FromArguments::from_args(args).unwrap();

        assert_eq!(text, "hi");
        assert_eq!(count, 2);
    }

    #[test]
    fn it_extracts_the_context_out_of_band() {
        let ctx = Context::test();
        let args = Arguments::new(vec![Value::from("hi")], ctx);

        let (ctx, text): (Context, String) = FromArguments::from_args(args).unwrap();

        assert_eq!(text, "hi");
        assert_eq!(ctx.request_id, "test");
    }

    #[test]
    fn it_fails_with_invalid_params_on_type_mismatch() {
        let ctx = Context::test();
        let args = Arguments::new(vec![Value::from("not a number")], ctx);

        let err = <(i64,) as FromArguments>::from_args(args).unwrap_err();

        assert_eq!(err.code(), crate::error::ErrorCode::InvalidParams);
    }
}
