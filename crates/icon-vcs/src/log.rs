use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::commit::Commit;
use crate::error::{VcsError, VcsResult};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Encode a commit as one log frame.
///
/// On-disk format:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Commit)]
/// ```
pub fn encode_frame(commit: &Commit) -> VcsResult<Vec<u8>> {
    let payload = bincode::serialize(commit).map_err(|e| VcsError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| VcsError::Serialization(format!("commit too large: {} bytes", payload.len())))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Commits read back from a log, and how many leading bytes were valid.
#[derive(Debug)]
pub struct Recovered {
    pub commits: Vec<Commit>,
    pub valid_len: u64,
}

/// Decode frames front-to-back.
///
/// Commits chain by parent, so a bad frame cannot simply be skipped: decoding
/// stops at the first frame that is truncated, fails its CRC, does not
/// deserialize, or does not hash to its own ID. Everything before it is kept.
pub fn decode_frames(bytes: &[u8]) -> Recovered {
    let mut commits = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let Some(header) = bytes.get(offset..offset + HEADER_SIZE) else {
            warn!(offset, "truncated commit log header; stopping recovery");
            break;
        };
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let start = offset + HEADER_SIZE;
        let Some(payload) = bytes.get(start..start + length) else {
            warn!(offset, length, "truncated commit log entry; stopping recovery");
            break;
        };

        let actual_crc = crc32fast::hash(payload);
        if length == 0 || actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch in commit log; stopping recovery"
            );
            break;
        }

        match bincode::deserialize::<Commit>(payload) {
            Ok(commit) if commit.verify_id() => commits.push(commit),
            Ok(commit) => {
                warn!(offset, commit = %commit.id, "commit does not match its ID; stopping recovery");
                break;
            }
            Err(e) => {
                warn!(offset, error = %e, "failed to deserialize commit; stopping recovery");
                break;
            }
        }
        offset = start + length;
    }

    Recovered {
        commits,
        valid_len: offset as u64,
    }
}

/// Append-only commit log file.
///
/// A failed append is cut back off the file before the error is returned, so
/// the log never holds a frame its caller was told did not land. If that cut
/// fails too, the log refuses further appends until it is reopened, so no
/// later commit can chain past the stray frame.
pub struct CommitLog {
    path: PathBuf,
    file: File,
    len: u64,
    poisoned: bool,
    #[cfg(test)]
    fail_next_sync: bool,
}

impl CommitLog {
    /// Open (or create) the log and read back every intact commit.
    ///
    /// A damaged tail is cut off so later appends follow the last good frame.
    pub fn open(path: &Path) -> VcsResult<(Self, Vec<Commit>)> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let recovered = decode_frames(&bytes);

        if recovered.valid_len < bytes.len() as u64 {
            warn!(
                path = %path.display(),
                valid = recovered.valid_len,
                file_len = bytes.len(),
                "discarding damaged commit log tail"
            );
            file.set_len(recovered.valid_len)?;
            file.sync_all()?;
        }

        debug!(recovered = recovered.commits.len(), "commit log recovery complete");
        Ok((
            Self {
                path: path.to_path_buf(),
                file,
                len: recovered.valid_len,
                poisoned: false,
                #[cfg(test)]
                fail_next_sync: false,
            },
            recovered.commits,
        ))
    }

    /// Append one commit and sync it to disk. Returns the frame's offset.
    pub fn append(&mut self, commit: &Commit) -> VcsResult<u64> {
        if self.poisoned {
            return Err(VcsError::Unavailable(format!(
                "commit log {} has an unremoved partial frame; reopen the store",
                self.path.display()
            )));
        }
        let frame = encode_frame(commit)?;
        let offset = self.len;
        if let Err(e) = self.write_frame(&frame) {
            self.roll_back(offset);
            return Err(e.into());
        }
        self.len += frame.len() as u64;
        debug!(offset, len = frame.len(), commit = %commit.id.short(), "commit log append");
        Ok(offset)
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.file.write_all(frame)?;
        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_sync) {
            return Err(io::Error::other("sync failed"));
        }
        self.file.sync_data()
    }

    /// Cut the file back to `offset` after a failed append.
    fn roll_back(&mut self, offset: u64) {
        match self.file.set_len(offset).and_then(|()| self.file.sync_data()) {
            Ok(()) => warn!(offset, "commit log append failed; partial frame removed"),
            Err(e) => {
                self.poisoned = true;
                error!(
                    path = %self.path.display(),
                    offset,
                    error = %e,
                    "commit log append failed and the partial frame could not be removed"
                );
            }
        }
    }

    /// Make the next append fail after its bytes reach the file.
    #[cfg(test)]
    pub(crate) fn fail_next_sync(&mut self) {
        self.fail_next_sync = true;
    }

    /// Drop every commit.
    pub fn truncate(&mut self) -> VcsResult<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.len = 0;
        self.poisoned = false;
        debug!("commit log truncated");
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
