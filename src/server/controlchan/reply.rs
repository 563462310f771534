use crate::storage::{self, ErrorKind};

/// A reply to the FTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    None,
    CodeAndMsg { code: ReplyCode, msg: String },
    MultiLine { code: ReplyCode, lines: Vec<String> },
}

/// The reply codes according to RFC 959 that this server sends.
//
// Codes between 100 and 199 indicate marks, between 200 and 399 acceptance and between 400 and
// 599 rejection. Clients should not look past the first digit, except for 227 and 257 which have a
// special format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ReplyCode {
    FileStatusOkay = 150,

    CommandOkay = 200,
    CommandOkayNotImplemented = 202,
    SystemStatus = 211,
    FileStatus = 213,
    HelpMessage = 214,
    SystemType = 215,
    ServiceReady = 220,
    ClosingControlConnection = 221,
    ClosingDataConnection = 226,
    EnteringPassiveMode = 227,
    UserLoggedIn = 230,
    FileActionOkay = 250,
    DirCreated = 257,

    NeedPassword = 331,
    FileActionPending = 350,

    ServiceNotAvailable = 421,
    CantOpenDataConnection = 425,
    ConnectionClosed = 426,
    LocalError = 451,
    OutOfSpace = 452,

    CommandSyntaxError = 500,
    ParameterSyntaxError = 501,
    CommandNotImplemented = 502,
    BadCommandSequence = 503,
    CommandNotImplementedForParameter = 504,
    NotLoggedIn = 530,
    FileError = 550,
    BadFileName = 553,
}

impl ReplyCode {
    // Replies that count against the session's tolerance for protocol violations.
    pub fn is_protocol_violation(self) -> bool {
        matches!(
            self,
            ReplyCode::CommandSyntaxError | ReplyCode::ParameterSyntaxError | ReplyCode::BadCommandSequence
        )
    }
}

impl Reply {
    pub fn new(code: ReplyCode, message: &str) -> Self {
        Reply::CodeAndMsg {
            code,
            msg: message.to_string(),
        }
    }

    pub fn new_with_string(code: ReplyCode, msg: String) -> Self {
        Reply::CodeAndMsg { code, msg }
    }

    pub fn new_multiline<I>(code: ReplyCode, lines: I) -> Self
    where
        I: IntoIterator,
        I::Item: std::fmt::Display,
    {
        Reply::MultiLine {
            code,
            lines: lines.into_iter().map(|item| format!("{}", item)).collect(),
        }
    }

    // A no-reply
    pub fn none() -> Self {
        Reply::None
    }

    pub fn code(&self) -> Option<ReplyCode> {
        match self {
            Reply::None => None,
            Reply::CodeAndMsg { code, .. } | Reply::MultiLine { code, .. } => Some(*code),
        }
    }
}

impl From<&storage::Error> for Reply {
    fn from(err: &storage::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Reply::new(ReplyCode::FileError, "File not found"),
            ErrorKind::PermissionDenied => Reply::new(ReplyCode::FileError, "Permission denied"),
            ErrorKind::NotADirectory => Reply::new(ReplyCode::FileError, "Not a directory"),
            ErrorKind::DirectoryNotEmpty => Reply::new(ReplyCode::FileError, "Directory not empty"),
            ErrorKind::FileNameNotAllowed => Reply::new(ReplyCode::BadFileName, "File name not allowed"),
            ErrorKind::InsufficientStorage => Reply::new(ReplyCode::OutOfSpace, "Insufficient storage space"),
            ErrorKind::BackendUnavailable => Reply::new(ReplyCode::LocalError, "Storage backend unavailable, try again later"),
            ErrorKind::LocalError => Reply::new(ReplyCode::LocalError, "Local error"),
            ErrorKind::Unsupported => Reply::new(ReplyCode::CommandNotImplemented, "Operation not supported by this storage backend"),
        }
    }
}

impl From<storage::Error> for Reply {
    fn from(err: storage::Error) -> Self {
        Reply::from(&err)
    }
}
