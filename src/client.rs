use crate::error::{Error, FrameError, Result};
use crate::protocol::{Command, Limits, decode_file_frame};
use crate::session::Session;
use crate::size::format_size;
use anyhow::Context;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

const MENU: &str = "
***************************************************
                      MENU
[1] - List available files.
[2] - Get file.
[3] - Exit.
***************************************************";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: SocketAddr,
    pub output_dir: PathBuf,
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    ListFiles,
    GetFile,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim().parse::<i32>() {
            Ok(1) => Ok(MenuChoice::ListFiles),
            Ok(2) => Ok(MenuChoice::GetFile),
            Ok(3) => Ok(MenuChoice::Exit),
            _ => Err(Error::InputValidation(format!(
                "invalid option {:?}, expected 1, 2 or 3",
                input.trim()
            ))),
        }
    }
}

pub fn parse_file_id(input: &str) -> Result<i32> {
    input.trim().parse::<i32>().map_err(|_| {
        Error::InputValidation(format!(
            "invalid file id {:?}, it must be a number",
            input.trim()
        ))
    })
}

#[derive(Debug, PartialEq, Eq)]
pub enum Download {
    Stored { path: PathBuf, bytes: u64 },
    /// The server answered with an empty payload.
    NotFound,
}

/// Asks for the listing. Only what fits in one receive of
/// `max_list_response_size` bytes is returned.
pub async fn list_files<S>(session: &mut Session<S>, limits: &Limits) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    session.send(&Command::ListFiles.encode()).await?;
    let response = session.receive_once(limits.max_list_response_size).await?;
    debug!("Listing response of {} bytes", response.len());
    Ok(String::from_utf8_lossy(&response).into_owned())
}

/// Downloads file `id` into `output_dir`, replacing any file of the same name.
///
/// The transfer ends at the first empty receive. A server that dies halfway
/// looks exactly like one that finished, and the partial file is kept.
pub async fn get_file<S>(
    session: &mut Session<S>,
    id: i32,
    limits: &Limits,
    output_dir: &Path,
) -> Result<Download>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    session.send(&Command::GetFile { id }.encode()).await?;

    let mut buf = vec![0u8; limits.max_file_buffer_size.max(1)];
    let mut filled = session.receive(&mut buf).await?;
    if filled == 0 {
        return Ok(Download::NotFound);
    }

    // The header can straddle receives when the transport delivers small chunks.
    let (name, content_start) = loop {
        let decoded =
            decode_file_frame(&buf[..filled]).map(|h| (h.name, filled - h.content_prefix.len()));
        match decoded {
            Ok(header) => break header,
            Err(FrameError::Incomplete { needed, available }) if filled < buf.len() => {
                let n = session.receive(&mut buf[filled..]).await?;
                if n == 0 {
                    return Err(FrameError::Incomplete { needed, available }.into());
                }
                filled += n;
            }
            Err(e) => return Err(e.into()),
        }
    };

    let path = output_path(output_dir, &name)?;
    let output_err = |e: std::io::Error| Error::Output {
        path: path.clone(),
        reason: e.to_string(),
    };

    let mut file = File::create(&path).await.map_err(output_err)?;
    file.write_all(&buf[content_start..filled])
        .await
        .map_err(output_err)?;
    let mut bytes = (filled - content_start) as u64;

    loop {
        let n = session.receive(&mut buf).await?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).await.map_err(output_err)?;
        bytes += n as u64;
    }
    file.flush().await.map_err(output_err)?;

    info!("Stored {:?} ({})", path, format_size(bytes));
    Ok(Download::Stored { path, bytes })
}

fn output_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || name.contains(['/', '\\']) {
        return Err(Error::Output {
            path: dir.join(name),
            reason: "file name must be a plain name without directories".into(),
        });
    }
    Ok(dir.join(name))
}

/// Interactive loop. Every round opens a connection before the menu is
/// shown and closes it afterwards, even when the choice was invalid.
pub struct Client<R, W> {
    config: ClientConfig,
    input: R,
    output: W,
}

impl<R, W> Client<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(config: ClientConfig, input: R, output: W) -> Self {
        Client {
            config,
            input,
            output,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut running = true;
        while running {
            let mut session = Session::connect(self.config.server)
                .await
                .with_context(|| format!("cannot connect to {}", self.config.server))?;
            writeln!(self.output, "Socket connection established...")?;
            writeln!(self.output, "{MENU}")?;

            let outcome = match self.prompt("Choose an option: ").await? {
                None => {
                    running = false;
                    Ok(())
                }
                Some(line) => match MenuChoice::parse(&line) {
                    Ok(MenuChoice::ListFiles) => self.list_flow(&mut session).await,
                    Ok(MenuChoice::GetFile) => self.get_file_flow(&mut session).await,
                    Ok(MenuChoice::Exit) => {
                        running = false;
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
            };

            match outcome {
                Ok(()) => {}
                Err(Error::InputValidation(msg)) => writeln!(self.output, "Error: {msg}")?,
                Err(e) => {
                    warn!("Request to {} failed: {}", session.peer(), e);
                    writeln!(self.output, "Error: {e}")?;
                }
            }

            if let Err(e) = session.close().await {
                warn!("Closing connection failed: {}", e);
            }
        }

        writeln!(self.output, "Client application finished!")?;
        Ok(())
    }

    async fn list_flow(&mut self, session: &mut Session) -> Result<()> {
        let listing = list_files(session, &self.config.limits).await?;
        writeln!(self.output, "Files available on the server:\n{listing}")?;
        Ok(())
    }

    async fn get_file_flow(&mut self, session: &mut Session) -> Result<()> {
        let Some(line) = self.prompt("Enter the id of the file to fetch: ").await? else {
            return Err(Error::InputValidation("no file id given".into()));
        };
        let id = parse_file_id(&line)?;

        match get_file(session, id, &self.config.limits, &self.config.output_dir).await? {
            Download::Stored { path, bytes } => writeln!(
                self.output,
                "Received {} and stored it in {}",
                format_size(bytes),
                path.display()
            )?,
            Download::NotFound => writeln!(self.output, "File not found on the server!")?,
        }
        Ok(())
    }

    /// `None` once the input is exhausted.
    async fn prompt(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}
