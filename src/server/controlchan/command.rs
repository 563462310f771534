use super::commands::{ModeParam, Opt, StruParam, TypeParam};
use crate::server::password::Password;

use bytes::Bytes;
use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    User {
        /// The bytes making up the actual username.
        username: Bytes,
    },
    Pass {
        /// The bytes making up the actual password.
        password: Password,
    },
    Syst,
    Type {
        /// The representation type the client asked for.
        param: TypeParam,
    },
    Stru {
        /// The structure to which the client would like to switch. Only the `File` structure is
        /// supported.
        structure: StruParam,
    },
    Mode {
        /// The transfer mode to which the client would like to switch. Only the `Stream` mode is
        /// supported.
        mode: ModeParam,
    },
    Help,
    Noop,
    Pasv,
    // PORT and EPRT. Active mode is refused, so the address is not kept.
    Port,
    Retr {
        /// The path to the file the client would like to retrieve.
        path: String,
    },
    Stor {
        /// The path to the file the client would like to store.
        path: String,
    },
    Appe {
        /// The path to the file the client would like to append to.
        path: String,
    },
    List {
        /// Arguments passed along with the list command.
        options: Option<String>,
        /// The path of the file/directory the clients wants to list
        path: Option<String>,
    },
    Nlst {
        /// The path of the file/directory the clients wants to list.
        path: Option<String>,
    },
    Feat,
    Pwd,
    Cwd {
        /// The path the client would like to change directory to.
        path: String,
    },
    Cdup,
    Opts {
        /// The option the client wants to set
        option: Opt,
    },
    Dele {
        /// The (regular) file to delete.
        path: String,
    },
    Rmd {
        /// The directory to delete.
        path: String,
    },
    Quit,
    Mkd {
        /// The path to the directory the client wants to create.
        path: String,
    },
    // The argument is optional and ignored since there is nothing to reserve.
    Allo,
    Abor,
    Rnfr {
        /// The file to be renamed
        file: String,
    },
    Rnto {
        /// The filename to rename to
        file: String,
    },
    Size {
        file: String,
    },
    /// Modification Time (MDTM) as specified in RFC 3659.
    Mdtm {
        file: String,
    },
    /// Anything we don't implement.
    Other {
        command_name: String,
        arguments: String,
    },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
