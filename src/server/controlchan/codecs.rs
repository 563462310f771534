use super::{
    Reply,
    command::Command,
    error::ControlChanError,
    line_parser::{
        self,
        error::{ParseError, ParseErrorKind},
    },
};

use bytes::BytesMut;
use std::io::Write;
use tokio_util::codec::{Decoder, Encoder};

// Longest command line we buffer while waiting for its end-of-line.
const MAX_LINE_LENGTH: usize = 8192;

// FtpCodec implements tokio's `Decoder` and `Encoder` traits for the control channel, that we'll
// use to decode FTP commands and encode their responses.
//
// A line that does not parse is handed up as an `Err` item rather than as a decoding error: the
// session answers it and keeps reading, while a decoding error ends the stream. The same goes for
// a line that grows past `MAX_LINE_LENGTH`; the rest of it is skipped up to its end-of-line.
#[derive(Debug)]
pub struct FtpCodec {
    // Stored index of the next index to examine for a '\n' character. This is used to optimize
    // searching. For example, if `decode` was called with `abc`, it would hold `3`, because that
    // is the next index to examine. The next time `decode` is called with `abcde\n`, we will only
    // look at `de\n` before returning.
    next_index: usize,
    // Set while skipping the tail of an over-long line.
    discarding: bool,
}

impl FtpCodec {
    pub fn new() -> Self {
        FtpCodec {
            next_index: 0,
            discarding: false,
        }
    }
}

impl Decoder for FtpCodec {
    type Item = Result<Command, ParseError>;
    type Error = ControlChanError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.discarding {
            match buf.iter().position(|b| *b == b'\n') {
                Some(newline_index) => {
                    let _ = buf.split_to(newline_index + 1);
                    self.discarding = false;
                }
                None => {
                    buf.clear();
                    return Ok(None);
                }
            }
        }
        if let Some(newline_offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') {
            let newline_index = newline_offset + self.next_index;
            let line = buf.split_to(newline_index + 1);
            self.next_index = 0;
            if line.len() > MAX_LINE_LENGTH {
                return Ok(Some(Err(ParseErrorKind::LineTooLong.into())));
            }
            Ok(Some(line_parser::parse(line)))
        } else if buf.len() > MAX_LINE_LENGTH {
            buf.clear();
            self.next_index = 0;
            self.discarding = true;
            Ok(Some(Err(ParseErrorKind::LineTooLong.into())))
        } else {
            self.next_index = buf.len();
            Ok(None)
        }
    }
}

impl Encoder<Reply> for FtpCodec {
    type Error = ControlChanError;

    fn encode(&mut self, reply: Reply, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let mut buffer = vec![];
        match reply {
            Reply::None => {
                return Ok(());
            }
            Reply::CodeAndMsg { code, msg } => {
                if msg.is_empty() {
                    writeln!(buffer, "{}\r", code as u32)?;
                } else {
                    writeln!(buffer, "{} {}\r", code as u32, msg)?;
                }
            }
            Reply::MultiLine { code, mut lines } => {
                // The last line carries the code, the others are the body.
                let last_line = lines.pop().unwrap_or_default();

                // Body lines starting with a digit could be mistaken for a reply code.
                for it in lines.iter_mut() {
                    if it.starts_with(|c: char| c.is_ascii_digit()) {
                        it.insert(0, ' ');
                    }
                }
                if lines.is_empty() {
                    writeln!(buffer, "{} {}\r", code as u32, last_line)?;
                } else {
                    write!(buffer, "{}-{}\r\n{} {}\r\n", code as u32, lines.join("\r\n"), code as u32, last_line)?;
                }
            }
        }
        buf.extend(&buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::controlchan::ReplyCode;
    use pretty_assertions::assert_eq;

    fn encode(reply: Reply) -> String {
        let mut buf = BytesMut::new();
        FtpCodec::new().encode(reply, &mut buf).unwrap();
        String::from_utf8(buf.to_vec()).unwrap()
    }

    #[test]
    fn encodes_single_line() {
        assert_eq!(encode(Reply::new(ReplyCode::CommandOkay, "OK")), "200 OK\r\n");
        assert_eq!(encode(Reply::none()), "");
    }

    #[test]
    fn encodes_multi_line() {
        let reply = Reply::new_multiline(ReplyCode::SystemStatus, ["Extensions supported:", "SIZE", "2 things", "END"]);
        assert_eq!(encode(reply), "211-Extensions supported:\r\nSIZE\r\n 2 things\r\n211 END\r\n");
    }

    #[test]
    fn decodes_line_by_line() {
        let mut codec = FtpCodec::new();
        let mut buf = BytesMut::from(&b"NOOP\r\nPW"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Ok(Command::Noop)));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"D\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Ok(Command::Pwd)));
    }

    #[test]
    fn bad_line_is_an_item_not_a_stream_error() {
        let mut codec = FtpCodec::new();
        let mut buf = BytesMut::from(&b"NOOP extra\r\nNOOP\r\n"[..]);
        assert!(matches!(codec.decode(&mut buf), Ok(Some(Err(_)))));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Ok(Command::Noop)));
    }

    #[test]
    fn overlong_line_is_skipped_to_its_end() {
        let mut codec = FtpCodec::new();
        let mut buf = BytesMut::from(&vec![b'A'; MAX_LINE_LENGTH + 1][..]);
        let item = codec.decode(&mut buf).unwrap();
        assert_eq!(item, Some(Err(ParseError::from(ParseErrorKind::LineTooLong))));
        assert!(buf.is_empty());

        buf.extend_from_slice(b"AAAA");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"AA\r\nNOOP\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Ok(Command::Noop)));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn overlong_line_arriving_whole_is_refused() {
        let mut codec = FtpCodec::new();
        let mut buf = BytesMut::from(&vec![b'A'; MAX_LINE_LENGTH][..]);
        buf.extend_from_slice(b"\r\nNOOP\r\n");
        let item = codec.decode(&mut buf).unwrap();
        assert_eq!(item, Some(Err(ParseError::from(ParseErrorKind::LineTooLong))));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Ok(Command::Noop)));
    }
}
