//! Positional parameter mapping between call sites and the wire.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tether_json_rpc::ResponseError;

use crate::descriptor::Arity;

/// Turn positional arguments into the `params` member of an outbound
/// envelope.
///
/// A single argument for a one-parameter method goes out verbatim, so an
/// array stays one array. Multi-parameter methods get an array padded with
/// `null` to the declared length; extra arguments are dropped.
pub fn build_params(arity: Arity, args: Vec<Value>) -> Option<Value> {
    match arity {
        Arity::Fixed(0) => None,
        Arity::Fixed(1) => Some(args.into_iter().next().unwrap_or(Value::Null)),
        Arity::Fixed(n) => {
            let mut args = args;
            args.resize(n, Value::Null);
            Some(Value::Array(args))
        }
        Arity::Variadic => match args.len() {
            0 => None,
            1 => args.into_iter().next(),
            _ => Some(Value::Array(args)),
        },
    }
}

/// Map the `params` member of an inbound envelope back onto positional
/// arguments for a handler of the given arity.
pub fn adapt_params(arity: Arity, params: Option<Value>) -> Params {
    let args = match arity {
        Arity::Fixed(0) => Vec::new(),
        Arity::Fixed(1) => vec![params.unwrap_or(Value::Null)],
        Arity::Fixed(n) => {
            let mut args = match params {
                Some(Value::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            };
            args.resize(n, Value::Null);
            args
        }
        Arity::Variadic => match params {
            None => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
        },
    };
    Params(args)
}

/// Positional arguments handed to a handler
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params(Vec<Value>);

impl Params {
    pub fn new(args: Vec<Value>) -> Self {
        Self(args)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw argument at `index`; `Null` when out of range
    pub fn value(&self, index: usize) -> &Value {
        self.0.get(index).unwrap_or(&Value::Null)
    }

    /// Deserialize the argument at `index`.
    ///
    /// A missing argument deserializes from `null`, so `Option<T>` accepts it.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, ResponseError> {
        T::deserialize(self.value(index)).map_err(|e| {
            ResponseError::invalid_params(&format!("parameter {}: {}", index, e))
        })
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }

    /// The arguments as one JSON value: `null`, the sole argument, or an array
    pub fn into_value(self) -> Value {
        build_params(Arity::Variadic, self.0).unwrap_or(Value::Null)
    }
}

impl From<Vec<Value>> for Params {
    fn from(args: Vec<Value>) -> Self {
        Self(args)
    }
}

impl IntoIterator for Params {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Build a positional argument list from serializable expressions.
///
/// ```
/// use tether_connection::args;
///
/// let args = args!["foo", 10, vec![1, 2]];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {{
        let args: ::std::vec::Vec<$crate::__private::Value> =
            ::std::vec![$($crate::__private::json!($arg)),*];
        args
    }};
}
