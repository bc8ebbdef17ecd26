//! Handler parameter shapes
//!
//! A handler states its parameters once, at registration. The resulting
//! [`HandlerDescriptor`] drives argument binding for every call.

use crate::errors::RegistrationError;

/// One declared handler parameter, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// Positional parameter, filled from path captures only
    Positional(String),
    /// `*args`-style catch-all for extra positionals
    VarPositional,
    /// Receives the request object
    Request,
    /// Keyword-only parameter
    KeywordOnly { name: String, required: bool },
    /// Accepts arbitrary extra keywords
    VarKeyword,
}

impl Param {
    fn rank(&self) -> u8 {
        match self {
            Param::Positional(_) | Param::Request => 0,
            Param::VarPositional => 1,
            Param::KeywordOnly { .. } => 2,
            Param::VarKeyword => 3,
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            Param::Positional(name) | Param::KeywordOnly { name, .. } => Some(name),
            Param::Request => Some(crate::binder::REQUEST_KEY),
            _ => None,
        }
    }
}

/// Ordered parameter list of a handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(mut self, name: &str) -> Self {
        self.params.push(Param::Positional(name.to_string()));
        self
    }

    pub fn var_positional(mut self) -> Self {
        self.params.push(Param::VarPositional);
        self
    }

    pub fn request(mut self) -> Self {
        self.params.push(Param::Request);
        self
    }

    /// Keyword-only parameter without a default
    pub fn required(mut self, name: &str) -> Self {
        self.params.push(Param::KeywordOnly {
            name: name.to_string(),
            required: true,
        });
        self
    }

    /// Keyword-only parameter with a default
    pub fn optional(mut self, name: &str) -> Self {
        self.params.push(Param::KeywordOnly {
            name: name.to_string(),
            required: false,
        });
        self
    }

    pub fn var_keyword(mut self) -> Self {
        self.params.push(Param::VarKeyword);
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

/// What the binder needs to know about a handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerDescriptor {
    accepts_request: bool,
    named: Vec<String>,
    required: Vec<String>,
    accepts_arbitrary_keywords: bool,
}

impl HandlerDescriptor {
    /// Validate `signature` and derive the descriptor.
    ///
    /// The request parameter may only be followed by `*args`, keyword-only
    /// parameters or `**kwargs`.
    pub fn from_signature(handler: &str, signature: &Signature) -> Result<Self, RegistrationError> {
        let mut descriptor = Self::default();
        let mut seen: Vec<&str> = Vec::new();
        let mut last_rank = 0;
        let mut var_positional = false;

        for param in signature.params() {
            if param.rank() < last_rank {
                return Err(RegistrationError::signature(
                    handler,
                    format!("parameter {:?} is out of order", param),
                ));
            }
            last_rank = param.rank();

            if let Some(name) = param.name() {
                if seen.contains(&name) {
                    return Err(RegistrationError::signature(
                        handler,
                        format!("duplicate parameter {}", name),
                    ));
                }
                seen.push(name);
            }

            match param {
                Param::Positional(_) if descriptor.accepts_request => {
                    return Err(RegistrationError::signature(
                        handler,
                        "request parameter must be the last named parameter",
                    ));
                }
                Param::Positional(_) => {}
                Param::Request => descriptor.accepts_request = true,
                Param::VarPositional => {
                    if var_positional {
                        return Err(RegistrationError::signature(handler, "repeated *args"));
                    }
                    var_positional = true;
                }
                Param::KeywordOnly { name, required } => {
                    descriptor.named.push(name.clone());
                    if *required {
                        descriptor.required.push(name.clone());
                    }
                }
                Param::VarKeyword => {
                    if descriptor.accepts_arbitrary_keywords {
                        return Err(RegistrationError::signature(handler, "repeated **kwargs"));
                    }
                    descriptor.accepts_arbitrary_keywords = true;
                }
            }
        }

        Ok(descriptor)
    }

    pub fn accepts_request(&self) -> bool {
        self.accepts_request
    }

    /// All keyword-only parameter names
    pub fn named(&self) -> &[String] {
        &self.named
    }

    /// Keyword-only parameters without a default
    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn accepts_arbitrary_keywords(&self) -> bool {
        self.accepts_arbitrary_keywords
    }

    /// Whether the handler reads any keyword data from query or body
    pub fn wants_keywords(&self) -> bool {
        self.accepts_arbitrary_keywords || !self.named.is_empty()
    }
}
