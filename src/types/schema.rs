//! Input schema generation for registered components
//!
//! The schema of a component is derived once, at registration time, from its
//! declared parameter list and is treated as opaque afterwards.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::ops::{Deref, DerefMut};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Represents a schema property type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// Unknown type; never emitted into a schema.
    None,

    /// String type
    String,

    /// Integer type
    Integer,

    /// Floating-point number type
    Number,

    /// Boolean type
    #[serde(rename = "boolean")]
    Bool,

    /// Array type
    Array,

    /// Object type
    Object,

    /// The JSON `null` type; only appears in nullable unions.
    Null,

    /// Any type; emitted as an empty schema object.
    Any,
}

impl Display for PropertyType {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::String => write!(f, "string"),
            PropertyType::Integer => write!(f, "integer"),
            PropertyType::Number => write!(f, "number"),
            PropertyType::Bool => write!(f, "boolean"),
            PropertyType::Array => write!(f, "array"),
            PropertyType::Object => write!(f, "object"),
            PropertyType::Null => write!(f, "null"),
            PropertyType::Any => write!(f, "any"),
            PropertyType::None => write!(f, "none"),
        }
    }
}

/// The `type` field of a schema property: a single type or a union
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    /// A single type, e.g. `"string"`
    One(PropertyType),
    /// A union of types, e.g. `["integer", "null"]`
    Many(Vec<PropertyType>),
}

/// A single property of an [`InputSchema`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaProperty {
    /// Property type; absent for "any"-typed and enum parameters.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<SchemaType>,

    /// Allowed values for enumerated parameters.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    /// Format hint, e.g. `"date-time"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// A human-readable description of a property
    #[serde(rename = "description", skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,
}

/// A JSON-Schema-like descriptor of a tool's expected arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    /// Schema object type
    ///
    /// > Note: always "object"
    #[serde(rename = "type")]
    pub r#type: PropertyType,

    /// A map of parameter name to its property descriptor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, SchemaProperty>>,

    /// Names of the parameters that must be present; omitted when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl Default for InputSchema {
    #[inline]
    fn default() -> Self {
        Self {
            r#type: PropertyType::Object,
            properties: Some(HashMap::new()),
            required: None,
        }
    }
}

impl InputSchema {
    /// Derives an [`InputSchema`] from a declared parameter list
    pub fn from_params(params: &[ToolParam]) -> Self {
        let mut properties = HashMap::new();
        let mut required = Vec::new();
        for param in params {
            properties.insert(param.name.clone(), param.property());
            if param.required {
                required.push(param.name.clone());
            }
        }
        Self {
            r#type: PropertyType::Object,
            properties: Some(properties),
            required: if required.is_empty() { None } else { Some(required) },
        }
    }
}

/// A declared parameter of a tool, resource template or prompt
#[derive(Debug, Clone)]
pub struct ToolParam {
    /// Parameter name, matched against the keys of the call arguments.
    pub name: String,

    pub(crate) r#type: PropertyType,
    pub(crate) union: Option<Vec<PropertyType>>,
    pub(crate) descr: Option<String>,
    pub(crate) required: bool,
    pub(crate) nullable: bool,
    pub(crate) default: Option<Value>,
    pub(crate) enum_values: Option<Vec<Value>>,
    pub(crate) format: Option<String>,
}

impl ToolParam {
    fn typed(name: impl Into<String>, r#type: PropertyType) -> Self {
        Self {
            name: name.into(),
            r#type,
            union: None,
            descr: None,
            required: true,
            nullable: false,
            default: None,
            enum_values: None,
            format: None,
        }
    }

    /// Creates a string parameter
    pub fn string(name: impl Into<String>) -> Self {
        Self::typed(name, PropertyType::String)
    }

    /// Creates an integer parameter
    pub fn integer(name: impl Into<String>) -> Self {
        Self::typed(name, PropertyType::Integer)
    }

    /// Creates a floating-point parameter
    pub fn number(name: impl Into<String>) -> Self {
        Self::typed(name, PropertyType::Number)
    }

    /// Creates a boolean parameter
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::typed(name, PropertyType::Bool)
    }

    /// Creates an array parameter
    pub fn array(name: impl Into<String>) -> Self {
        Self::typed(name, PropertyType::Array)
    }

    /// Creates an object parameter
    pub fn object(name: impl Into<String>) -> Self {
        Self::typed(name, PropertyType::Object)
    }

    /// Creates an untyped parameter; emitted as an empty schema
    pub fn any(name: impl Into<String>) -> Self {
        Self::typed(name, PropertyType::Any)
    }

    /// Creates a date-time parameter: a string with the `date-time` format
    pub fn date_time(name: impl Into<String>) -> Self {
        let mut param = Self::typed(name, PropertyType::String);
        param.format = Some("date-time".into());
        param
    }

    /// Creates an enumerated parameter
    pub fn enumeration<T, I>(name: impl Into<String>, values: T) -> Self
    where
        T: IntoIterator<Item = I>,
        I: Into<Value>,
    {
        let mut param = Self::typed(name, PropertyType::None);
        param.enum_values = Some(values.into_iter().map(Into::into).collect());
        param
    }

    /// Creates a parameter accepting a union of non-null types
    pub fn union<T>(name: impl Into<String>, types: T) -> Self
    where
        T: IntoIterator<Item = PropertyType>,
    {
        let mut param = Self::typed(name, PropertyType::None);
        param.union = Some(types.into_iter().collect());
        param
    }

    pub(crate) fn of(name: impl Into<String>, r#type: PropertyType) -> Self {
        Self::typed(name, r#type)
    }

    /// Marks the parameter nullable: `T | null` in the schema,
    /// excluded from `required`, bound to `null` when absent
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self.required = false;
        self
    }

    /// Sets a default value and excludes the parameter from `required`
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    /// Sets a description for a parameter
    pub fn with_description(mut self, descr: impl Into<String>) -> Self {
        self.descr = Some(descr.into());
        self
    }

    /// Builds the schema property descriptor of this parameter
    pub(crate) fn property(&self) -> SchemaProperty {
        let r#type = if self.enum_values.is_some() {
            None
        } else if let Some(union) = &self.union {
            let mut types = union.clone();
            if self.nullable {
                types.push(PropertyType::Null);
            }
            Some(SchemaType::Many(types))
        } else if self.r#type == PropertyType::Any {
            None
        } else if self.nullable {
            Some(SchemaType::Many(vec![self.r#type, PropertyType::Null]))
        } else {
            Some(SchemaType::One(self.r#type))
        };
        SchemaProperty {
            r#type,
            enum_values: self.enum_values.clone(),
            format: self.format.clone(),
            descr: self.descr.clone(),
        }
    }

    /// Coerces a string-sourced value to the declared numeric or boolean type.
    /// Values that already carry the right JSON type pass through unchanged.
    pub(crate) fn coerce(&self, value: Value) -> Result<Value, crate::error::Error> {
        use crate::error::{Error, ErrorCode};
        let Value::String(raw) = value else {
            return Ok(value);
        };
        match self.r#type {
            PropertyType::Integer => raw.parse::<i64>()
                .map(Value::from)
                .map_err(|_| Error::new(
                    ErrorCode::InvalidParams,
                    format!("Argument '{}' is not an integer: {raw}", self.name))),
            PropertyType::Number => raw.parse::<f64>()
                .map(Value::from)
                .map_err(|_| Error::new(
                    ErrorCode::InvalidParams,
                    format!("Argument '{}' is not a number: {raw}", self.name))),
            PropertyType::Bool => match raw.as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(Error::new(
                    ErrorCode::InvalidParams,
                    format!("Argument '{}' is not a boolean: {raw}", self.name))),
            },
            _ => Ok(Value::String(raw)),
        }
    }
}

// Preventing conflicts
pub(crate) mod sealed {
    pub(crate) trait TypeCategorySealed {}
}

/// A trait that helps to determine a category of an object type
pub(crate) trait TypeCategory: sealed::TypeCategorySealed {
    fn category() -> PropertyType;
}

macro_rules! impl_type_category {
    { $($type:ty => $category:expr),* $(,)? } => {
        $(
        impl sealed::TypeCategorySealed for $type {}
        impl TypeCategory for $type {
            #[inline]
            fn category() -> PropertyType { $category }
        }
        )*
    };
}

impl_type_category! {
    String => PropertyType::String,
    bool => PropertyType::Bool,
    i8 => PropertyType::Integer,
    i16 => PropertyType::Integer,
    i32 => PropertyType::Integer,
    i64 => PropertyType::Integer,
    isize => PropertyType::Integer,
    u8 => PropertyType::Integer,
    u16 => PropertyType::Integer,
    u32 => PropertyType::Integer,
    u64 => PropertyType::Integer,
    usize => PropertyType::Integer,
    f32 => PropertyType::Number,
    f64 => PropertyType::Number,
    serde_json::Value => PropertyType::Any,
    DateTime<Utc> => PropertyType::String,
}

impl<T> sealed::TypeCategorySealed for Vec<T> {}
impl<T> TypeCategory for Vec<T> {
    #[inline]
    fn category() -> PropertyType {
        PropertyType::Array
    }
}

impl<T: TypeCategory> sealed::TypeCategorySealed for Option<T> {}
impl<T: TypeCategory> TypeCategory for Option<T> {
    #[inline]
    fn category() -> PropertyType {
        T::category()
    }
}

impl<T> sealed::TypeCategorySealed for Json<T> {}
impl<T> TypeCategory for Json<T> {
    #[inline]
    fn category() -> PropertyType {
        PropertyType::Object
    }
}

/// Wraps JSON-typed data
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwraps the inner `T`
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize> From<T> for Json<T> {
    #[inline]
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}
