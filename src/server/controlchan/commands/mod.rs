//! This module contains the implementations for the FTP commands defined in
//!
//! - [RFC 959 - FTP](https://tools.ietf.org/html/rfc959)
//! - [RFC 2389 - Feature negotiation](https://tools.ietf.org/html/rfc2389)
//! - [RFC 3659 - Extensions to FTP](https://tools.ietf.org/html/rfc3659)

mod abor;
mod allo;
mod appe;
mod cdup;
mod common;
mod cwd;
mod dele;
mod feat;
mod help;
mod list;
mod mdtm;
mod mkd;
mod mode;
mod nlst;
mod noop;
mod opts;
mod other;
mod pass;
mod pasv;
mod port;
mod pwd;
mod quit;
mod retr;
mod rmd;
mod rnfr;
mod rnto;
mod size;
mod stor;
mod stru;
mod syst;
mod transfer_common;
mod type_;
mod user;

pub use abor::Abor;
pub use allo::Allo;
pub use appe::Appe;
pub use cdup::Cdup;
pub use cwd::Cwd;
pub use dele::Dele;
pub use feat::Feat;
pub use help::Help;
pub use list::List;
pub use mdtm::Mdtm;
pub use mkd::Mkd;
pub use mode::{Mode, ModeParam};
pub use nlst::Nlst;
pub use noop::Noop;
pub use opts::{Opt, Opts};
pub use other::Other;
pub use pass::Pass;
pub use pasv::Pasv;
pub use port::Port;
pub use pwd::Pwd;
pub use quit::Quit;
pub use retr::Retr;
pub use rmd::Rmd;
pub use rnfr::Rnfr;
pub use rnto::Rnto;
pub use size::Size;
pub use stor::Stor;
pub use stru::{Stru, StruParam};
pub use syst::Syst;
pub use type_::{Type, TypeParam};
pub use user::User;
