//! Chunked uploads and downloads, with optional secret-chat encryption.
//!
//! Parts are powers of two between 16 KiB and 512 KiB sized so the whole
//! file fits in at most 3000 parts; files over 10 MiB take the big-file
//! path. Secret-chat files are AES-IGE encrypted part by part under a fresh
//! key/iv pair whose md5-based fingerprint rides in the file descriptor.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tangram_crypto::{aes, md5};
use tangram_tl::{enums, functions};

use crate::errors::InvocationError;
use crate::Client;

/// Smallest part size.
pub const MIN_PART_SIZE: i64 = 16 * 1024;
/// Largest part size (also the download chunk).
pub const MAX_PART_SIZE: i64 = 512 * 1024;
/// Hard cap on upload parts.
pub const MAX_FILE_PARTS: i64 = 3000;
/// Files above this go through `upload.saveBigFilePart`.
pub const BIG_FILE_THRESHOLD: i64 = 10 * 1024 * 1024;
/// Download request size.
pub const DOWNLOAD_CHUNK: i64 = 512 * 1024;

/// Smallest power of two ≥ `size / MAX_FILE_PARTS`, clamped to the window.
pub fn part_size_for(size: i64) -> i64 {
    let needed = (size + MAX_FILE_PARTS - 1) / MAX_FILE_PARTS;
    let mut part = MIN_PART_SIZE;
    while part < needed && part < MAX_PART_SIZE {
        part <<= 1;
    }
    part.clamp(MIN_PART_SIZE, MAX_PART_SIZE)
}

/// Fingerprint of a secret-file key/iv pair:
/// `md5(key ‖ iv)[0..4] XOR md5(key ‖ iv)[4..8]`.
pub fn encrypted_file_fingerprint(key: &[u8; 32], iv: &[u8; 32]) -> i32 {
    let digest = md5!(key, iv);
    let a = i32::from_le_bytes(digest[0..4].try_into().unwrap());
    let b = i32::from_le_bytes(digest[4..8].try_into().unwrap());
    a ^ b
}

/// Cooperative cancellation flag shared with the host.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the transfer stops at the next part boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress observer: `(transferred_bytes, total_bytes)` after each part.
pub type ProgressFn = Arc<dyn Fn(i64, i64) + Send + Sync>;

/// Options shared by the upload entry points.
#[derive(Clone, Default)]
pub struct TransferOptions {
    /// Progress callback.
    pub progress: Option<ProgressFn>,
    /// Cancellation token.
    pub cancel: Option<CancelToken>,
}

impl TransferOptions {
    fn report(&self, done: i64, total: i64) {
        if let Some(p) = &self.progress {
            p(done, total);
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }
}

/// A fully uploaded plain file, ready to be referenced by `sendMedia`.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    /// The TL input reference.
    pub input: enums::InputFile,
    /// Number of parts sent.
    pub parts: i32,
    /// Original file name.
    pub name: String,
}

impl UploadedFile {
    /// Wrap as a document with the given mime type and attributes.
    pub fn as_document(
        &self,
        mime_type: impl Into<String>,
        mut attributes: Vec<enums::DocumentAttribute>,
    ) -> enums::InputMedia {
        attributes.push(enums::DocumentAttribute::Filename { file_name: self.name.clone() });
        enums::InputMedia::UploadedDocument {
            file: self.input.clone(),
            mime_type: mime_type.into(),
            attributes,
        }
    }

    /// Wrap as a photo.
    pub fn as_photo(&self) -> enums::InputMedia {
        enums::InputMedia::UploadedPhoto { file: self.input.clone() }
    }
}

/// A fully uploaded secret-chat file plus the material the descriptor needs.
#[derive(Clone, Debug)]
pub struct UploadedEncryptedFile {
    /// The TL input reference.
    pub input: enums::InputEncryptedFile,
    /// Number of parts sent.
    pub parts: i32,
    /// Per-file AES key.
    pub key: [u8; 32],
    /// Per-file AES IV (initial value).
    pub iv: [u8; 32],
    /// `md5(key ‖ iv)` folded fingerprint.
    pub fingerprint: i32,
    /// Plaintext size (the ciphertext is padded to 16).
    pub size: i64,
}

/// What to fetch and where to put it.
pub struct DownloadRequest {
    /// File location for `upload.getFile`.
    pub location: enums::InputFileLocation,
    /// DC hosting the file.
    pub dc_id: i32,
    /// Declared file size.
    pub size: i64,
    /// Access hash used to name the destination file.
    pub access_hash: i64,
    /// Optional file extension.
    pub ext: Option<String>,
    /// Key and IV for encrypted documents.
    pub secret: Option<([u8; 32], [u8; 32])>,
    /// Progress/cancel options.
    pub options: TransferOptions,
}

impl Client {
    // ── Upload ─────────────────────────────────────────────────────────────

    /// Upload a plain file. Returns the reference to attach to `sendMedia`.
    pub async fn upload_file(
        &self,
        data: &[u8],
        name: &str,
        options: &TransferOptions,
    ) -> Result<UploadedFile, InvocationError> {
        let file_id = random_i64()?;
        let total = data.len() as i64;
        let part_size = part_size_for(total) as usize;
        let total_parts = ((total as usize + part_size - 1) / part_size) as i32;
        let big = total > BIG_FILE_THRESHOLD;

        let mut sent = 0i64;
        for (part_num, chunk) in data.chunks(part_size).enumerate() {
            if options.cancelled() {
                return Err(InvocationError::Cancelled);
            }
            self.save_part(file_id, part_num as i32, total_parts, big, chunk.to_vec()).await?;
            sent += chunk.len() as i64;
            options.report(sent, total);
            tracing::debug!("uploaded part {}/{total_parts}", part_num + 1);
        }

        let input = if big {
            enums::InputFile::Big { id: file_id, parts: total_parts, name: name.to_string() }
        } else {
            let digest = md5!(data);
            let md5_checksum = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
            enums::InputFile::File {
                id: file_id,
                parts: total_parts,
                name: name.to_string(),
                md5_checksum,
            }
        };
        tracing::info!("file '{name}' uploaded ({total} bytes, {total_parts} parts)");
        Ok(UploadedFile { input, parts: total_parts, name: name.to_string() })
    }

    /// Upload a thumbnail as a single-part file (always before the main file).
    pub async fn upload_thumb(&self, data: &[u8]) -> Result<UploadedFile, InvocationError> {
        if data.len() as i64 > MAX_PART_SIZE {
            return Err(InvocationError::Deserialize("thumbnail exceeds one part".into()));
        }
        let file_id = random_i64()?;
        self.save_part(file_id, 0, 1, false, data.to_vec()).await?;
        Ok(UploadedFile {
            input: enums::InputFile::File {
                id: file_id,
                parts: 1,
                name: "thumb.jpg".to_string(),
                md5_checksum: String::new(),
            },
            parts: 1,
            name: "thumb.jpg".to_string(),
        })
    }

    /// Upload a file for a secret chat: per-part AES-IGE under a fresh key.
    pub async fn upload_encrypted_file(
        &self,
        data: &[u8],
        options: &TransferOptions,
    ) -> Result<UploadedEncryptedFile, InvocationError> {
        let file_id = random_i64()?;
        let mut key = [0u8; 32];
        let mut iv = [0u8; 32];
        getrandom::getrandom(&mut key).map_err(|_| InvocationError::Dropped)?;
        getrandom::getrandom(&mut iv).map_err(|_| InvocationError::Dropped)?;
        let fingerprint = encrypted_file_fingerprint(&key, &iv);

        let total = data.len() as i64;
        let part_size = part_size_for(total) as usize;
        let total_parts = ((data.len() + part_size - 1) / part_size) as i32;
        let big = total > BIG_FILE_THRESHOLD;

        let mut running_iv = iv;
        let mut sent = 0i64;
        for (part_num, chunk) in data.chunks(part_size).enumerate() {
            if options.cancelled() {
                return Err(InvocationError::Cancelled);
            }
            let mut block = chunk.to_vec();
            if block.len() % 16 != 0 {
                // Only the final part may be short; pad it with random bytes.
                let pad = 16 - block.len() % 16;
                let mut rnd = [0u8; 16];
                getrandom::getrandom(&mut rnd).map_err(|_| InvocationError::Dropped)?;
                block.extend_from_slice(&rnd[..pad]);
            }
            aes::ige_encrypt_continuing(&mut block, &key, &mut running_iv);
            sent += chunk.len() as i64;
            self.save_part(file_id, part_num as i32, total_parts, big, block).await?;
            options.report(sent, total);
        }

        let input = if big {
            enums::InputEncryptedFile::BigUploaded {
                id: file_id,
                parts: total_parts,
                key_fingerprint: fingerprint,
            }
        } else {
            enums::InputEncryptedFile::Uploaded {
                id: file_id,
                parts: total_parts,
                md5_checksum: String::new(),
                key_fingerprint: fingerprint,
            }
        };
        Ok(UploadedEncryptedFile { input, parts: total_parts, key, iv, fingerprint, size: total })
    }

    async fn save_part(
        &self,
        file_id: i64,
        file_part: i32,
        file_total_parts: i32,
        big: bool,
        bytes: Vec<u8>,
    ) -> Result<(), InvocationError> {
        if big {
            self.invoke(&functions::upload::SaveBigFilePart {
                file_id,
                file_part,
                file_total_parts,
                bytes,
            })
            .await?;
        } else {
            self.invoke(&functions::upload::SaveFilePart { file_id, file_part, bytes }).await?;
        }
        Ok(())
    }

    /// Send an uploaded file to a peer as media.
    pub async fn send_media(
        &self,
        peer: enums::InputPeer,
        media: enums::InputMedia,
    ) -> Result<(), InvocationError> {
        let random_id = random_i64()?;
        let updates = self
            .invoke(&functions::messages::SendMedia {
                peer,
                reply_to_msg_id: None,
                media,
                random_id,
            })
            .await?;
        self.handle_updates(updates).await;
        Ok(())
    }

    /// Send an uploaded encrypted file into a secret chat.
    pub async fn send_secret_file(
        &self,
        chat_id: i32,
        uploaded: &UploadedEncryptedFile,
        file_name: &str,
        mime_type: &str,
    ) -> Result<(), InvocationError> {
        let random_id = random_i64()?;
        let message = enums::DecryptedMessage::Message(tangram_tl::types::DecryptedMessageData {
            random_id,
            ttl: 0,
            message: String::new(),
            media: enums::DecryptedMessageMedia::Document(
                tangram_tl::types::DecryptedMessageMediaDocument {
                    thumb: Vec::new(),
                    thumb_w: 0,
                    thumb_h: 0,
                    file_name: file_name.to_string(),
                    mime_type: mime_type.to_string(),
                    size: uploaded.size as i32,
                    key: uploaded.key.to_vec(),
                    iv: uploaded.iv.to_vec(),
                },
            ),
        });
        let (peer, data) = self.seal_secret_message(chat_id, message).await?;
        self.invoke(&functions::messages::SendEncryptedFile {
            peer,
            random_id,
            data,
            file: uploaded.input.clone(),
        })
        .await?;
        Ok(())
    }

    // ── Download ───────────────────────────────────────────────────────────

    /// Download a file to `{download_dir}/download_{access_hash}[.{ext}]`,
    /// resuming a previous partial download when possible.
    pub async fn download_file(&self, req: DownloadRequest) -> Result<PathBuf, InvocationError> {
        let mut path = self.inner.download_dir.clone();
        let file_name = match &req.ext {
            Some(ext) => format!("download_{}.{ext}", req.access_hash),
            None => format!("download_{}", req.access_hash),
        };
        path.push(file_name);

        let existing = tokio::fs::metadata(&path).await.map(|m| m.len() as i64).unwrap_or(0);

        // An encrypted stream cannot rejoin mid-IV; start over instead.
        let mut offset = if req.secret.is_some() && existing > 0 { 0 } else { existing };
        if offset >= req.size && req.size > 0 {
            req.options.report(req.size, req.size);
            return Ok(path);
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(offset == 0)
            .open(&path)
            .await?;
        if offset > 0 {
            use tokio::io::AsyncSeekExt;
            file.seek(std::io::SeekFrom::Start(offset as u64)).await?;
        }

        let mut running_iv = req.secret.map(|(_, iv)| iv);

        loop {
            if req.options.cancelled() {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(InvocationError::Cancelled);
            }

            let answer = self
                .invoke_on_dc(
                    req.dc_id,
                    &functions::upload::GetFile {
                        location: req.location.clone(),
                        offset: offset as i32,
                        limit: DOWNLOAD_CHUNK as i32,
                    },
                )
                .await?;
            let enums::upload::File::File(chunk) = answer;

            let mut bytes = chunk.bytes;
            let received = bytes.len() as i64;
            if let (Some((key, _)), Some(iv)) = (&req.secret, running_iv.as_mut()) {
                aes::ige_decrypt_continuing(&mut bytes, key, iv);
            }

            use tokio::io::AsyncWriteExt;
            file.write_all(&bytes).await?;
            offset += received;
            req.options.report(offset.min(req.size), req.size);

            if received < DOWNLOAD_CHUNK || offset >= req.size {
                break;
            }
        }

        // Encrypted streams are padded to the block size; cut back.
        file.set_len(req.size as u64).await?;
        use tokio::io::AsyncWriteExt;
        file.flush().await?;
        tracing::info!("downloaded {} bytes to {}", req.size, path.display());
        Ok(path)
    }
}

fn random_i64() -> Result<i64, InvocationError> {
    let mut rnd = [0u8; 8];
    getrandom::getrandom(&mut rnd).map_err(|_| InvocationError::Dropped)?;
    Ok(i64::from_le_bytes(rnd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_sizes_are_powers_of_two_in_window() {
        for size in [1i64, 1024, MIN_PART_SIZE, 10 << 20, 100 << 20, 1 << 30] {
            let part = part_size_for(size);
            assert!((part as u64).is_power_of_two(), "size {size}");
            assert!((MIN_PART_SIZE..=MAX_PART_SIZE).contains(&part), "size {size}");
        }
    }

    #[test]
    fn part_count_stays_under_limit() {
        // Up to the maximum representable file (3000 × 512 KiB).
        for size in [1i64, 1 << 20, 200 << 20, MAX_FILE_PARTS * MAX_PART_SIZE] {
            let part = part_size_for(size);
            let parts = (size + part - 1) / part;
            assert!(parts <= MAX_FILE_PARTS, "size {size}: {parts} parts of {part}");
        }
    }

    #[test]
    fn small_file_uses_min_part() {
        assert_eq!(part_size_for(1), MIN_PART_SIZE);
        assert_eq!(part_size_for(MIN_PART_SIZE * MAX_FILE_PARTS), MIN_PART_SIZE);
        assert_eq!(part_size_for(MIN_PART_SIZE * MAX_FILE_PARTS + 1), MIN_PART_SIZE * 2);
    }

    #[test]
    fn fingerprint_folds_md5() {
        let key = [1u8; 32];
        let iv = [2u8; 32];
        let digest = md5!(&key, &iv);
        let expected = i32::from_le_bytes(digest[0..4].try_into().unwrap())
            ^ i32::from_le_bytes(digest[4..8].try_into().unwrap());
        assert_eq!(encrypted_file_fingerprint(&key, &iv), expected);
    }

    #[test]
    fn cancel_token_flips_once() {
        let t = CancelToken::new();
        assert!(!t.is_cancelled());
        let clone = t.clone();
        clone.cancel();
        assert!(t.is_cancelled());
    }
}
