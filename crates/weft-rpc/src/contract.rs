//! Method bindings and service contracts.

use std::fmt;

use weft_wire::Verb;

use crate::descriptor::TypeDescriptor;

/// Largest number of positional parameters a bound method may declare.
pub const MAX_PARAMETERS: usize = 6;

/// Remote-callable method: name, verb, route and type descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBinding {
    method_name: String,
    route_override: Option<String>,
    verb: Verb,
    parameters: Vec<TypeDescriptor>,
    returns: TypeDescriptor,
}

impl MethodBinding {
    /// Declares a `POST` binding with no parameters and a derived route.
    pub fn new(method_name: impl Into<String>, returns: TypeDescriptor) -> Self {
        Self {
            method_name: method_name.into(),
            route_override: None,
            verb: Verb::Post,
            parameters: Vec::new(),
            returns,
        }
    }

    /// Appends a positional parameter.
    #[must_use]
    pub fn param(mut self, descriptor: TypeDescriptor) -> Self {
        self.parameters.push(descriptor);
        self
    }

    /// Overrides the verb.
    #[must_use]
    pub const fn with_verb(mut self, verb: Verb) -> Self {
        self.verb = verb;
        self
    }

    /// Overrides the route name. Leading slashes are ignored.
    #[must_use]
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route_override = Some(route.into());
        self
    }

    /// Declared method name.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Declared verb.
    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.verb
    }

    /// Parameter descriptors in positional order.
    #[must_use]
    pub fn parameters(&self) -> &[TypeDescriptor] {
        &self.parameters
    }

    /// Return descriptor.
    #[must_use]
    pub const fn returns(&self) -> &TypeDescriptor {
        &self.returns
    }

    /// Returns `true` when the route was declared explicitly.
    #[must_use]
    pub const fn has_route_override(&self) -> bool {
        self.route_override.is_some()
    }

    /// Route name without the namespace prefix.
    #[must_use]
    pub fn route_name(&self) -> String {
        match &self.route_override {
            Some(route) => route.trim_start_matches('/').to_owned(),
            None => derive_route_name(&self.method_name),
        }
    }

    /// Full route under `prefix`, which must end with `/`.
    #[must_use]
    pub fn route(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.route_name())
    }
}

impl fmt::Display for MethodBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.method_name)?;
        for (index, parameter) in self.parameters.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{parameter}")?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

/// Derives the default route name from a method name.
///
/// Word boundaries in camel or Pascal case become underscores, runs of
/// capitals are kept together as one word, and anything that is not ASCII
/// alphanumeric becomes an underscore.
///
/// ```
/// use weft_rpc::derive_route_name;
///
/// assert_eq!(derive_route_name("getAddressList"), "get_address_list");
/// assert_eq!(derive_route_name("parseHTTPHeader"), "parse_http_header");
/// ```
#[must_use]
pub fn derive_route_name(method_name: &str) -> String {
    let chars: Vec<char> = method_name.chars().collect();
    let mut route = String::with_capacity(method_name.len() + 4);
    for (index, &ch) in chars.iter().enumerate() {
        if !ch.is_ascii_alphanumeric() {
            if !route.is_empty() && !route.ends_with('_') {
                route.push('_');
            }
            continue;
        }
        if ch.is_ascii_uppercase() && index > 0 {
            let previous = chars[index - 1];
            let next_is_lower = chars.get(index + 1).is_some_and(char::is_ascii_lowercase);
            let boundary = previous.is_ascii_lowercase()
                || previous.is_ascii_digit()
                || (previous.is_ascii_uppercase() && next_is_lower);
            if boundary && !route.is_empty() && !route.ends_with('_') {
                route.push('_');
            }
        }
        route.push(ch.to_ascii_lowercase());
    }
    while route.ends_with('_') {
        route.pop();
    }
    route
}

/// Named service and its bindings in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContract {
    name: String,
    bindings: Vec<MethodBinding>,
}

impl ServiceContract {
    pub(crate) fn new(name: String, bindings: Vec<MethodBinding>) -> Self {
        Self { name, bindings }
    }

    /// Service identity.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bindings in declaration order.
    #[must_use]
    pub fn bindings(&self) -> &[MethodBinding] {
        &self.bindings
    }
}
