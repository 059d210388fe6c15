use serde::{Deserialize, Serialize};

/// Three-component spatial vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Typed value of a single node property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    Long(i64),
    String(String),
    Vector3(Vector3),
    /// Position plus a row-major 3x3 rotation matrix
    Transform {
        position: Vector3,
        rotation: [f32; 9],
    },
    /// Asset URL such as `rbxassetid://1234`
    ContentRef(String),
    /// Reference to another node in the tree, by referent id
    Ref(Option<String>),
    /// Structured value this model does not interpret
    Opaque { type_name: String, bytes: Vec<u8> },
}

impl PropertyValue {
    pub const IDENTITY_ROTATION: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

    /// Transform at `position` with no rotation
    pub fn translation(position: Vector3) -> Self {
        PropertyValue::Transform {
            position,
            rotation: Self::IDENTITY_ROTATION,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::Double(_) => "double",
            PropertyValue::Long(_) => "long",
            PropertyValue::String(_) => "string",
            PropertyValue::Vector3(_) => "vector3",
            PropertyValue::Transform { .. } => "transform",
            PropertyValue::ContentRef(_) => "content",
            PropertyValue::Ref(_) => "ref",
            PropertyValue::Opaque { .. } => "opaque",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            PropertyValue::Int(_)
                | PropertyValue::Float(_)
                | PropertyValue::Double(_)
                | PropertyValue::Long(_)
        )
    }

    /// Numeric value widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(n) => Some(f64::from(*n)),
            PropertyValue::Float(n) => Some(f64::from(*n)),
            PropertyValue::Double(n) => Some(*n),
            PropertyValue::Long(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        PropertyValue::Int(n)
    }
}

impl From<f32> for PropertyValue {
    fn from(n: f32) -> Self {
        PropertyValue::Float(n)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Double(n)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Long(n)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<Vector3> for PropertyValue {
    fn from(v: Vector3) -> Self {
        PropertyValue::Vector3(v)
    }
}
