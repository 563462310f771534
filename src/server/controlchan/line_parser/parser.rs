use super::error::{ParseErrorKind, Result};
use crate::server::{
    controlchan::{
        command::Command,
        commands::{ModeParam, Opt, StruParam, TypeParam},
    },
    password::Password,
};

use bytes::Bytes;
use std::str;

/// Parse the given bytes into a [`Command`].
///
/// The line must end in `\n`, optionally preceded by `\r`. Verbs are case insensitive. Verbs we do
/// not know come back as [`Command::Other`] so that the session can answer them with 500, a known
/// verb with a bad parameter is an [`InvalidCommand`](ParseErrorKind::InvalidCommand) error.
///
/// [`Command`]: super::super::command::Command
pub fn parse<T>(line: T) -> Result<Command>
where
    T: AsRef<[u8]> + Into<Bytes>,
{
    let vec = line.into().to_vec();
    let mut iter = vec.splitn(2, |&b| b == b' ' || b == b'\r' || b == b'\n');
    let cmd_token = normalize(iter.next().unwrap_or_default())?;
    let cmd_params = String::from(str::from_utf8(iter.next().unwrap_or_default())?);

    let cmd = match &*cmd_token {
        "USER" => {
            let username = required(cmd_params)?;
            Command::User { username }
        }
        "PASS" => {
            // An empty password is legal, anonymous clients sometimes send one.
            let password = parse_to_eol(cmd_params)?;
            Command::Pass {
                password: Password::new(password),
            }
        }
        "SYST" => no_params(cmd_params, Command::Syst)?,
        "TYPE" => {
            let params = required(cmd_params)?;
            let param = match params.first().map(u8::to_ascii_uppercase) {
                Some(b'A') => TypeParam::Ascii,
                Some(b'I') => TypeParam::Image,
                Some(b'E') => TypeParam::Ebcdic,
                Some(b'L') => TypeParam::Local,
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            };
            Command::Type { param }
        }
        "STRU" => {
            let params = parse_to_eol(cmd_params)?;
            if params.len() > 1 {
                return Err(ParseErrorKind::InvalidCommand.into());
            }
            match params.first().map(u8::to_ascii_uppercase) {
                Some(b'F') => Command::Stru { structure: StruParam::File },
                Some(b'R') => Command::Stru { structure: StruParam::Record },
                Some(b'P') => Command::Stru { structure: StruParam::Page },
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            }
        }
        "MODE" => {
            let params = parse_to_eol(cmd_params)?;
            if params.len() > 1 {
                return Err(ParseErrorKind::InvalidCommand.into());
            }
            match params.first().map(u8::to_ascii_uppercase) {
                Some(b'S') => Command::Mode { mode: ModeParam::Stream },
                Some(b'B') => Command::Mode { mode: ModeParam::Block },
                Some(b'C') => Command::Mode { mode: ModeParam::Compressed },
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            }
        }
        "HELP" => {
            parse_to_eol(cmd_params)?;
            Command::Help
        }
        "NOOP" => no_params(cmd_params, Command::Noop)?,
        "PASV" => no_params(cmd_params, Command::Pasv)?,
        "PORT" | "EPRT" => {
            required(cmd_params)?;
            Command::Port
        }
        "RETR" => Command::Retr {
            path: required_string(cmd_params)?,
        },
        "STOR" => Command::Stor {
            path: required_string(cmd_params)?,
        },
        "APPE" => Command::Appe {
            path: required_string(cmd_params)?,
        },
        "LIST" => {
            let line = parse_to_eol(cmd_params)?;
            let line = String::from_utf8_lossy(&line);
            let (flags, words): (Vec<&str>, Vec<&str>) = line.split(' ').filter(|s| !s.is_empty()).partition(|s| s.starts_with('-'));
            let options = if flags.is_empty() { None } else { Some(flags.join(" ")) };
            let path = if words.is_empty() { None } else { Some(words.join(" ")) };
            Command::List { options, path }
        }
        "NLST" => {
            let path = parse_to_eol(cmd_params)?;
            let path = if path.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&path).to_string())
            };
            Command::Nlst { path }
        }
        "FEAT" => no_params(cmd_params, Command::Feat)?,
        "PWD" | "XPWD" => no_params(cmd_params, Command::Pwd)?,
        "CWD" | "XCWD" => Command::Cwd {
            path: required_string(cmd_params)?,
        },
        "CDUP" | "XCUP" => no_params(cmd_params, Command::Cdup)?,
        "OPTS" => {
            let params = required(cmd_params)?;
            match params.to_ascii_uppercase().as_slice() {
                b"UTF8 ON" | b"UTF8" => Command::Opts {
                    option: Opt::Utf8 { on: true },
                },
                b"UTF8 OFF" => Command::Opts {
                    option: Opt::Utf8 { on: false },
                },
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            }
        }
        "DELE" => Command::Dele {
            path: required_string(cmd_params)?,
        },
        "RMD" | "XRMD" => Command::Rmd {
            path: required_string(cmd_params)?,
        },
        "QUIT" => no_params(cmd_params, Command::Quit)?,
        "MKD" | "XMKD" => Command::Mkd {
            path: required_string(cmd_params)?,
        },
        "ALLO" => {
            parse_to_eol(cmd_params)?;
            Command::Allo
        }
        "ABOR" => no_params(cmd_params, Command::Abor)?,
        "RNFR" => Command::Rnfr {
            file: required_string(cmd_params)?,
        },
        "RNTO" => Command::Rnto {
            file: required_string(cmd_params)?,
        },
        "SIZE" => Command::Size {
            file: required_string(cmd_params)?,
        },
        "MDTM" => Command::Mdtm {
            file: required_string(cmd_params)?,
        },
        _ => {
            let params = parse_to_eol(cmd_params)?;
            Command::Other {
                command_name: cmd_token,
                arguments: String::from_utf8_lossy(&params).to_string(),
            }
        }
    };

    Ok(cmd)
}

fn no_params(params: String, cmd: Command) -> Result<Command> {
    if parse_to_eol(params)?.is_empty() {
        Ok(cmd)
    } else {
        Err(ParseErrorKind::InvalidCommand.into())
    }
}

fn required(params: String) -> Result<Bytes> {
    let params = parse_to_eol(params)?;
    if params.is_empty() {
        return Err(ParseErrorKind::InvalidCommand.into());
    }
    Ok(params)
}

fn required_string(params: String) -> Result<String> {
    let params = required(params)?;
    Ok(String::from_utf8_lossy(&params).to_string())
}

/// Try to parse `text`, up to end of line.
fn parse_to_eol(text: String) -> Result<Bytes> {
    let (mut text, contains_null) = find_eol(text)?;
    if contains_null {
        text.retain(|c| c != '\0');
    }
    let line = text.strip_suffix("\r\n").or_else(|| text.strip_suffix('\n')).unwrap_or(&text);
    Ok(Bytes::copy_from_slice(line.as_bytes()))
}

// Checks that `text` ends in `\n` or `\r\n`. Telnet clients may send `\r\0` or `\0\n`, the
// nulls are reported so they can be stripped.
fn find_eol(text: String) -> Result<(String, bool)> {
    let mut last_ch = '\n';
    let mut contains_null = false;
    for ch in text.chars() {
        match (last_ch, ch) {
            ('\r', '\n') => {
                return Ok((text, contains_null));
            }
            ('\r', '\0') => {
                contains_null = true;
            }
            ('\r', _) => {
                return Err(ParseErrorKind::InvalidEol.into());
            }
            (_, '\n') => {
                return Ok((text, contains_null || last_ch == '\0'));
            }
            _ => {}
        }
        last_ch = ch;
    }
    Err(ParseErrorKind::InvalidEol.into())
}

fn normalize(token: &[u8]) -> Result<String> {
    Ok(str::from_utf8(token).map(|t| t.to_uppercase())?)
}
