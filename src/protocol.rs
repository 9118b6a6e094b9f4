//! Wire format shared by server and client.
//!
//! Nothing on the wire says which shape a response has. The requester picks
//! the decoder from the command it sent: a list request gets plain text back,
//! a get-file request gets either an empty payload or a file frame.

use crate::error::{DecodeError, FrameError};

pub const LIST_FILES_COMMAND: &str = "Get_Files";
pub const GET_FILE_COMMAND: &str = "Get_File_";
pub const NOT_RECOGNIZED_RESPONSE: &str = "Command not recognized!";

const NAME_LEN_SIZE: usize = 4;

/// Receive buffer sizes. Anything past a limit is dropped without notice:
/// a command over `max_command_size` is cut, a listing over
/// `max_list_response_size` is cut, and `max_file_buffer_size` bounds each
/// receive of a file transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_command_size: usize,
    pub max_list_response_size: usize,
    pub max_file_buffer_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_command_size: 1024,
            max_list_response_size: 1024,
            max_file_buffer_size: 1024 * 50000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ListFiles,
    GetFile { id: i32 },
}

impl Command {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::ListFiles => LIST_FILES_COMMAND.as_bytes().to_vec(),
            Command::GetFile { id } => format!("{GET_FILE_COMMAND}{id}").into_bytes(),
        }
    }

    /// Markers are matched case-insensitively anywhere in the text, and the
    /// list marker wins: `"Get_File_3 Get_Files"` is a list request.
    ///
    /// For a get-file request every occurrence of the marker is removed and
    /// what remains, trimmed, must be a decimal `i32`.
    pub fn decode(bytes: &[u8]) -> Result<Command, DecodeError> {
        let text = String::from_utf8_lossy(bytes);
        let folded = text.to_ascii_lowercase();

        if folded.contains(&LIST_FILES_COMMAND.to_ascii_lowercase()) {
            return Ok(Command::ListFiles);
        }

        let marker = GET_FILE_COMMAND.to_ascii_lowercase();
        if folded.contains(&marker) {
            // ASCII lowercasing keeps byte offsets, so `folded` indexes `text`.
            let mut rest = String::with_capacity(text.len());
            let mut last = 0;
            for (start, _) in folded.match_indices(&marker) {
                rest.push_str(&text[last..start]);
                last = start + marker.len();
            }
            rest.push_str(&text[last..]);

            if let Ok(id) = rest.trim().parse::<i32>() {
                return Ok(Command::GetFile { id });
            }
        }

        Err(DecodeError {
            text: text.into_owned(),
        })
    }
}

/// `name_len (u32 LE) || name || content` in one buffer.
pub fn encode_file_frame(name: &str, content: &[u8]) -> Result<Vec<u8>, FrameError> {
    let name_bytes = name.as_bytes();
    let name_len =
        u32::try_from(name_bytes.len()).map_err(|_| FrameError::NameTooLong(name_bytes.len()))?;

    let mut frame = Vec::with_capacity(NAME_LEN_SIZE + name_bytes.len() + content.len());
    frame.extend_from_slice(&name_len.to_le_bytes());
    frame.extend_from_slice(name_bytes);
    frame.extend_from_slice(content);
    Ok(frame)
}

#[derive(Debug, PartialEq, Eq)]
pub struct FrameHeader<'a> {
    pub name: String,
    /// The first slice of file content. The rest follows on later receives.
    pub content_prefix: &'a [u8],
}

/// Splits the first received chunk into the file name and the start of the
/// content. There is no total length, so the caller keeps reading until the
/// sender goes quiet.
pub fn decode_file_frame(chunk: &[u8]) -> Result<FrameHeader<'_>, FrameError> {
    if chunk.len() < NAME_LEN_SIZE {
        return Err(FrameError::Incomplete {
            needed: NAME_LEN_SIZE,
            available: chunk.len(),
        });
    }

    let mut len_buf = [0u8; NAME_LEN_SIZE];
    len_buf.copy_from_slice(&chunk[..NAME_LEN_SIZE]);
    let name_len = u32::from_le_bytes(len_buf) as usize;

    let name_end = NAME_LEN_SIZE.saturating_add(name_len);
    if chunk.len() < name_end {
        return Err(FrameError::Incomplete {
            needed: name_end,
            available: chunk.len(),
        });
    }

    let name = std::str::from_utf8(&chunk[NAME_LEN_SIZE..name_end])
        .map_err(|_| FrameError::InvalidName)?
        .to_string();

    Ok(FrameHeader {
        name,
        content_prefix: &chunk[name_end..],
    })
}
