//! BERT-RPC request and reply envelopes.
//!
//! ```text
//! request  {call, Module, Function, Args}
//!          {cast, Module, Function, Args}
//! reply    {reply, Result}
//!          {noreply}
//!          {error, {Type, Code, Class, Detail, Backtrace}}
//! ```

use std::fmt;

use bertrpc_term::Term;

use crate::error::{CallError, Result, RpcError};

/// Protocol error: the request frame could not be decoded.
pub const PROTOCOL_DECODE_FAILED: i64 = 1;
/// Protocol error: the request is not a `{call|cast, M, F, Args}` tuple.
pub const PROTOCOL_BAD_ENVELOPE: i64 = 2;
/// Server error: no such module.
pub const SERVER_NO_SUCH_MODULE: i64 = 1;
/// Server error: no such function.
pub const SERVER_NO_SUCH_FUNCTION: i64 = 2;
/// Server error: no more specific code applies, e.g. a result that cannot
/// be encoded.
pub const SERVER_UNDESIGNATED: i64 = 0;
/// User error: the function itself failed.
pub const USER_CALL_FAILED: i64 = 0;

const BERT_ERROR_CLASS: &str = "BERTError";

/// Whether the caller waits for the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Call,
    Cast,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Call => "call",
            CallKind::Cast => "cast",
        }
    }
}

/// A decoded request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub kind: CallKind,
    pub module: String,
    pub function: String,
    pub args: Vec<Term>,
}

impl Request {
    pub fn call(module: impl Into<String>, function: impl Into<String>, args: Vec<Term>) -> Self {
        Self::new(CallKind::Call, module, function, args)
    }

    pub fn cast(module: impl Into<String>, function: impl Into<String>, args: Vec<Term>) -> Self {
        Self::new(CallKind::Cast, module, function, args)
    }

    pub fn new(
        kind: CallKind,
        module: impl Into<String>,
        function: impl Into<String>,
        args: Vec<Term>,
    ) -> Self {
        Self {
            kind,
            module: module.into(),
            function: function.into(),
            args,
        }
    }

    /// Render as `{call|cast, Module, Function, Args}`.
    pub fn to_term(&self) -> Term {
        Term::tuple([
            Term::atom(self.kind.as_str()),
            Term::atom(self.module.as_str()),
            Term::atom(self.function.as_str()),
            Term::List(self.args.clone()),
        ])
    }

    /// Parse a request envelope. Module and function may be atoms or
    /// UTF-8 binaries.
    pub fn from_term(term: Term) -> Result<Self> {
        let items = match term {
            Term::Tuple(items) => items,
            other => return Err(invalid("request is not a tuple", &other)),
        };
        let [kind, module, function, args]: [Term; 4] = items
            .try_into()
            .map_err(|items: Vec<Term>| invalid_arity("request", 4, items.len()))?;

        let kind = match kind.as_atom_name() {
            Some("call") => CallKind::Call,
            Some("cast") => CallKind::Cast,
            _ => return Err(invalid("request type must be call or cast", &kind)),
        };
        let module = name_of(&module).ok_or_else(|| invalid("module is not a name", &module))?;
        let function =
            name_of(&function).ok_or_else(|| invalid("function is not a name", &function))?;
        let args = match args {
            Term::List(items) => items,
            Term::Nil => Vec::new(),
            other => return Err(invalid("arguments are not a list", &other)),
        };

        Ok(Self {
            kind,
            module,
            function,
            args,
        })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}/{}", self.kind.as_str(), self.module, self.function, self.args.len())
    }
}

/// The category of an error reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Protocol,
    Server,
    User,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Protocol => "protocol",
            ErrorType::Server => "server",
            ErrorType::User => "user",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "protocol" => Some(ErrorType::Protocol),
            "server" => Some(ErrorType::Server),
            "user" => Some(ErrorType::User),
            _ => None,
        }
    }
}

/// The payload of an `{error, ...}` reply.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    pub kind: ErrorType,
    pub code: i64,
    pub class: String,
    pub detail: String,
    pub backtrace: Vec<String>,
}

impl RemoteError {
    pub fn new(kind: ErrorType, code: i64, class: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            class: class.into(),
            detail: detail.into(),
            backtrace: Vec::new(),
        }
    }

    pub fn protocol(code: i64, detail: impl Into<String>) -> Self {
        Self::new(ErrorType::Protocol, code, BERT_ERROR_CLASS, detail)
    }

    pub fn server(code: i64, detail: impl Into<String>) -> Self {
        Self::new(ErrorType::Server, code, BERT_ERROR_CLASS, detail)
    }

    pub fn user(err: &CallError) -> Self {
        Self::new(ErrorType::User, USER_CALL_FAILED, err.class.clone(), err.message.clone())
    }

    /// Map a local dispatch failure to the error reply sent back to the
    /// caller.
    pub fn from_rpc_error(err: &RpcError) -> Self {
        match err {
            RpcError::NoSuchModule(_) => Self::server(SERVER_NO_SUCH_MODULE, err.to_string()),
            RpcError::NoSuchFunction { .. } => {
                Self::server(SERVER_NO_SUCH_FUNCTION, err.to_string())
            }
            RpcError::Call(call) => Self::user(call),
            RpcError::InvalidEnvelope(_) => Self::protocol(PROTOCOL_BAD_ENVELOPE, err.to_string()),
            RpcError::Codec(_) | RpcError::Frame(_) => {
                Self::protocol(PROTOCOL_DECODE_FAILED, err.to_string())
            }
            RpcError::Remote(remote) => remote.clone(),
            other => Self::server(0, other.to_string()),
        }
    }

    fn to_term(&self) -> Term {
        Term::tuple([
            Term::atom(self.kind.as_str()),
            Term::Integer(self.code),
            Term::from(self.class.as_str()),
            Term::from(self.detail.as_str()),
            Term::list(self.backtrace.iter().map(|line| Term::from(line.as_str()))),
        ])
    }

    fn from_term(term: &Term) -> Result<Self> {
        let items = term
            .as_tuple()
            .ok_or_else(|| invalid("error payload is not a tuple", term))?;
        let [kind, code, class, detail, rest @ ..] = items else {
            return Err(invalid_arity("error payload", 5, items.len()));
        };
        let kind = kind
            .as_atom_name()
            .and_then(ErrorType::parse)
            .ok_or_else(|| invalid("unknown error type", kind))?;
        let code = code
            .as_i64()
            .ok_or_else(|| invalid("error code is not an integer", code))?;
        let backtrace = rest
            .first()
            .and_then(Term::as_list)
            .map(|lines| lines.iter().map(text_of).collect())
            .unwrap_or_default();

        Ok(Self {
            kind,
            code,
            class: text_of(class),
            detail: text_of(detail),
            backtrace,
        })
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error {} ({}): {}",
            self.kind.as_str(),
            self.code,
            self.class,
            self.detail
        )
    }
}

/// A reply envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Value(Term),
    NoReply,
    Error(RemoteError),
}

impl Reply {
    pub fn to_term(&self) -> Term {
        match self {
            Reply::Value(value) => Term::tuple([Term::atom("reply"), value.clone()]),
            Reply::NoReply => Term::tuple([Term::atom("noreply")]),
            Reply::Error(err) => Term::tuple([Term::atom("error"), err.to_term()]),
        }
    }

    pub fn from_term(term: Term) -> Result<Self> {
        let mut items = match term {
            Term::Tuple(items) => items,
            other => return Err(invalid("reply is not a tuple", &other)),
        };
        let tag = items.first().and_then(Term::as_atom_name).map(str::to_owned);
        match (tag.as_deref(), items.len()) {
            (Some("reply"), 2) => Ok(Reply::Value(items.swap_remove(1))),
            (Some("noreply"), 1) => Ok(Reply::NoReply),
            (Some("error"), 2) => Ok(Reply::Error(RemoteError::from_term(&items[1])?)),
            _ => Err(invalid("unrecognized reply", &Term::Tuple(items))),
        }
    }

    /// Sent in place of a reply the encoder rejected, such as a result
    /// holding a non-finite float or an atom over 65535 bytes.
    pub fn unencodable(err: &impl fmt::Display) -> Self {
        Reply::Error(RemoteError::new(
            ErrorType::Server,
            SERVER_UNDESIGNATED,
            "EncodeError",
            err.to_string(),
        ))
    }

    /// Collapse to the caller's view: `{noreply}` reads as the empty list.
    pub fn into_result(self) -> Result<Term> {
        match self {
            Reply::Value(value) => Ok(value),
            Reply::NoReply => Ok(Term::Nil),
            Reply::Error(err) => Err(RpcError::Remote(err)),
        }
    }
}

fn name_of(term: &Term) -> Option<String> {
    match term {
        // `true` and `false` atoms always come back as booleans.
        Term::Boolean(b) => Some(b.to_string()),
        _ => term
            .as_atom_name()
            .or_else(|| term.as_str())
            .map(str::to_owned),
    }
}

fn text_of(term: &Term) -> String {
    match term.as_str().or_else(|| term.as_atom_name()) {
        Some(text) => text.to_string(),
        None => term.to_string(),
    }
}

fn invalid(what: &str, term: &Term) -> RpcError {
    RpcError::InvalidEnvelope(format!("{what}: {term}"))
}

fn invalid_arity(what: &str, expected: usize, got: usize) -> RpcError {
    RpcError::InvalidEnvelope(format!("{what} has {got} elements, expected {expected}"))
}
