// utils.rs - line codec and name validation
//
// minimal-irc-server - minimal IRC server
// Copyright (C) 2025  Leon Zipp
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LinesCodec};
use validator::ValidationError;

pub(crate) const MAX_CHANNEL_NAME_LEN: usize = 50;

// special LinesCodec for IRC - encode with "\r\n".
#[derive(Debug)]
pub(crate) struct IrcLinesCodec(LinesCodec);

impl IrcLinesCodec {
    pub(crate) fn new() -> IrcLinesCodec {
        IrcLinesCodec(LinesCodec::new())
    }

    pub(crate) fn new_with_max_length(max_length: usize) -> IrcLinesCodec {
        IrcLinesCodec(LinesCodec::new_with_max_length(max_length))
    }
}

impl<T: AsRef<str>> Encoder<T> for IrcLinesCodec {
    type Error = <LinesCodec as Encoder<T>>::Error;

    fn encode(&mut self, line: T, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let line = line.as_ref();
        buf.reserve(line.len() + 2);
        buf.put(line.as_bytes());
        // put "\r\n"
        buf.put_u8(b'\r');
        buf.put_u8(b'\n');
        Ok(())
    }
}

impl Decoder for IrcLinesCodec {
    type Item = <LinesCodec as Decoder>::Item;
    type Error = <LinesCodec as Decoder>::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        self.0.decode(buf)
    }
}

pub(crate) fn validate_nickname(nick: &str) -> Result<(), ValidationError> {
    if nick.is_empty() {
        Err(ValidationError::new("Nickname must not be empty."))
    } else if nick.as_bytes()[0] == b'#' || nick.as_bytes()[0] == b'&' {
        Err(ValidationError::new("Nickname must not have channel prefix."))
    } else if nick.bytes().any(|c| c <= 0x20 || c == 0x7f || c == b',' || c == b':') {
        Err(ValidationError::new(
            "Nickname must not contain control characters, spaces, ',' or ':'.",
        ))
    } else {
        Ok(())
    }
}

pub(crate) fn validate_channel(channel: &str) -> Result<(), ValidationError> {
    if channel.len() < 2 || channel.len() > MAX_CHANNEL_NAME_LEN {
        Err(ValidationError::new("Channel name length out of bounds."))
    } else if channel.as_bytes()[0] != b'#' && channel.as_bytes()[0] != b'&' {
        Err(ValidationError::new(
            "Channel name must have '#' or '&' at start.",
        ))
    } else if channel[1..]
        .bytes()
        .any(|c| c <= 0x20 || c == 0x7f || c == b',' || c == b':')
    {
        Err(ValidationError::new(
            "Channel name must not contain control characters, spaces, ',' or ':'.",
        ))
    } else {
        Ok(())
    }
}

// strip control characters from topic text and cap its length.
pub(crate) fn sanitize_topic(topic: &str) -> String {
    const MAX_TOPIC_LEN: usize = 390;
    let mut out = String::new();
    for c in topic.chars().filter(|c| *c >= ' ' && *c != '\x7f') {
        if out.len() + c.len_utf8() > MAX_TOPIC_LEN {
            break;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_irc_lines_codec() {
        let mut codec = IrcLinesCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("my line", &mut buf).unwrap();
        assert_eq!("my line\r\n".as_bytes(), buf);
        let mut buf = BytesMut::from("my line 2\n");
        assert_eq!(
            codec.decode(&mut buf).map_err(|e| e.to_string()),
            Ok(Some("my line 2".to_string()))
        );
        assert_eq!(buf, BytesMut::new());
        let mut buf = BytesMut::from("my line 2\r\n");
        assert_eq!(
            codec.decode(&mut buf).map_err(|e| e.to_string()),
            Ok(Some("my line 2".to_string()))
        );
        assert_eq!(buf, BytesMut::new());
    }

    #[test]
    fn test_irc_lines_codec_split_invariance() {
        // feeding the stream byte by byte must give the same lines
        // as feeding it in one shot.
        let input = b"PASS secret\r\nPRIVMSG #a :hello world\r\nQUIT\r\n";

        let mut codec = IrcLinesCodec::new();
        let mut buf = BytesMut::from(&input[..]);
        let mut whole = vec![];
        while let Some(line) = codec.decode(&mut buf).unwrap() {
            whole.push(line);
        }

        for chunk_size in 1..input.len() {
            let mut codec = IrcLinesCodec::new();
            let mut buf = BytesMut::new();
            let mut split = vec![];
            for chunk in input.chunks(chunk_size) {
                buf.extend_from_slice(chunk);
                while let Some(line) = codec.decode(&mut buf).unwrap() {
                    split.push(line);
                }
            }
            assert_eq!(whole, split, "chunk size {}", chunk_size);
        }
        assert_eq!(
            vec![
                "PASS secret".to_string(),
                "PRIVMSG #a :hello world".to_string(),
                "QUIT".to_string()
            ],
            whole
        );
    }

    #[test]
    fn test_irc_lines_codec_partial_line_retained() {
        let mut codec = IrcLinesCodec::new();
        let mut buf = BytesMut::from("NICK al");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"ice\r\nUS");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("NICK alice".to_string())
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"ER alice 0 * :Alice\r\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("USER alice 0 * :Alice".to_string())
        );
    }

    #[test]
    fn test_validate_nickname() {
        assert_eq!(true, validate_nickname("ala").is_ok());
        assert_eq!(false, validate_nickname("").is_ok());
        assert_eq!(false, validate_nickname("#ala").is_ok());
        assert_eq!(false, validate_nickname("&ala").is_ok());
        assert_eq!(false, validate_nickname("a,la").is_ok());
        assert_eq!(false, validate_nickname("aL:a").is_ok());
        assert_eq!(false, validate_nickname("a la").is_ok());
    }

    #[test]
    fn test_validate_channel() {
        assert_eq!(true, validate_channel("#ala").is_ok());
        assert_eq!(true, validate_channel("&ala").is_ok());
        assert_eq!(false, validate_channel("ala").is_ok());
        assert_eq!(false, validate_channel("#").is_ok());
        assert_eq!(false, validate_channel("#al:a").is_ok());
        assert_eq!(false, validate_channel("#al,a").is_ok());
        assert_eq!(false, validate_channel("#al a").is_ok());
        assert_eq!(false, validate_channel("#al\x01a").is_ok());
        let long = format!("#{}", "a".repeat(MAX_CHANNEL_NAME_LEN));
        assert_eq!(false, validate_channel(&long).is_ok());
    }

    #[test]
    fn test_sanitize_topic() {
        assert_eq!("new topic", sanitize_topic("new topic"));
        assert_eq!("newtopic", sanitize_topic("new\x01\x02topic"));
        assert_eq!("ab", sanitize_topic("a\x7fb"));
        let long = "x".repeat(500);
        assert_eq!(390, sanitize_topic(&long).len());
    }
}
