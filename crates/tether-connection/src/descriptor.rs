//! Method descriptors.
//!
//! A descriptor pairs a method name with its positional parameter count.
//! Plain strings act as untyped descriptors that take any number of
//! arguments.

use std::borrow::Cow;
use std::fmt;

/// How many positional parameters a method takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    Fixed(usize),
    /// Untyped: whatever the caller passes
    Variadic,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variadic => write!(f, "*"),
        }
    }
}

/// Anything that names a method and knows its arity
pub trait MessageSignature {
    fn method(&self) -> &str;
    fn arity(&self) -> Arity;
}

/// Signatures usable with `send_request` and `on_request`
pub trait RequestSignature: MessageSignature {}

/// Signatures usable with `send_notification` and `on_notification`
pub trait NotificationSignature: MessageSignature {}

/// Describes a request method and its parameter count
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestType {
    method: Cow<'static, str>,
    number_of_params: usize,
}

impl RequestType {
    pub const fn new(method: &'static str, number_of_params: usize) -> Self {
        Self {
            method: Cow::Borrowed(method),
            number_of_params,
        }
    }

    pub fn with_method(method: impl Into<String>, number_of_params: usize) -> Self {
        Self {
            method: Cow::Owned(method.into()),
            number_of_params,
        }
    }

    pub fn number_of_params(&self) -> usize {
        self.number_of_params
    }
}

/// Describes a notification method and its parameter count
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationType {
    method: Cow<'static, str>,
    number_of_params: usize,
}

impl NotificationType {
    pub const fn new(method: &'static str, number_of_params: usize) -> Self {
        Self {
            method: Cow::Borrowed(method),
            number_of_params,
        }
    }

    pub fn with_method(method: impl Into<String>, number_of_params: usize) -> Self {
        Self {
            method: Cow::Owned(method.into()),
            number_of_params,
        }
    }

    pub fn number_of_params(&self) -> usize {
        self.number_of_params
    }
}

impl MessageSignature for RequestType {
    fn method(&self) -> &str {
        &self.method
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(self.number_of_params)
    }
}

impl MessageSignature for NotificationType {
    fn method(&self) -> &str {
        &self.method
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(self.number_of_params)
    }
}

impl RequestSignature for RequestType {}
impl NotificationSignature for NotificationType {}

impl MessageSignature for str {
    fn method(&self) -> &str {
        self
    }

    fn arity(&self) -> Arity {
        Arity::Variadic
    }
}

impl MessageSignature for String {
    fn method(&self) -> &str {
        self
    }

    fn arity(&self) -> Arity {
        Arity::Variadic
    }
}

impl<T: MessageSignature + ?Sized> MessageSignature for &T {
    fn method(&self) -> &str {
        (**self).method()
    }

    fn arity(&self) -> Arity {
        (**self).arity()
    }
}

impl RequestSignature for str {}
impl RequestSignature for String {}
impl<T: RequestSignature + ?Sized> RequestSignature for &T {}

impl NotificationSignature for str {}
impl NotificationSignature for String {}
impl<T: NotificationSignature + ?Sized> NotificationSignature for &T {}

/// Helpers for declaring descriptors with a fixed arity
pub mod types {
    use super::{NotificationType, RequestType};

    pub const fn request0(method: &'static str) -> RequestType {
        RequestType::new(method, 0)
    }

    pub const fn request1(method: &'static str) -> RequestType {
        RequestType::new(method, 1)
    }

    pub const fn request2(method: &'static str) -> RequestType {
        RequestType::new(method, 2)
    }

    pub const fn request3(method: &'static str) -> RequestType {
        RequestType::new(method, 3)
    }

    pub const fn notification0(method: &'static str) -> NotificationType {
        NotificationType::new(method, 0)
    }

    pub const fn notification1(method: &'static str) -> NotificationType {
        NotificationType::new(method, 1)
    }

    pub const fn notification2(method: &'static str) -> NotificationType {
        NotificationType::new(method, 2)
    }
}
