//! AES-256-GCM envelope applied to every payload before it reaches a [`crate::store::SecretStore`].
//!
//! Layout: `version (1) || nonce (12) || ciphertext || tag (16)`. The storage name is bound as
//! associated data, so an envelope copied under another name fails to open.

// crates.io
use aes_gcm::{
	Aes256Gcm, Key, KeyInit, Nonce,
	aead::{Aead, Payload},
};
use rand::{TryRngCore, rngs::OsRng};
// self
use crate::{_prelude::*, vault::EncryptionKey};

const VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Seals `plaintext` under `key`, binding it to `name`.
pub(crate) fn seal(key: &EncryptionKey, name: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.expose()));
	let mut nonce = [0_u8; NONCE_LEN];

	OsRng
		.try_fill_bytes(&mut nonce)
		.map_err(|e| Error::vault("Operating system random source is unavailable.").with_source(e))?;

	let ciphertext = cipher
		.encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad: name.as_bytes() })
		.map_err(|_| Error::vault(format!("Failed to encrypt credential `{name}`.")))?;
	let mut envelope = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());

	envelope.push(VERSION);
	envelope.extend_from_slice(&nonce);
	envelope.extend_from_slice(&ciphertext);

	Ok(envelope)
}

/// Opens an envelope produced by [`seal`] for the same `name`.
pub(crate) fn open(key: &EncryptionKey, name: &str, envelope: &[u8]) -> Result<Vec<u8>> {
	let Some((&version, rest)) = envelope.split_first() else {
		return Err(Error::vault(format!("Stored payload for `{name}` is empty.")));
	};

	if version != VERSION {
		return Err(Error::vault(format!(
			"Stored payload for `{name}` uses unsupported envelope version {version}."
		)));
	}
	if rest.len() < NONCE_LEN + TAG_LEN {
		return Err(Error::vault(format!("Stored payload for `{name}` is truncated.")));
	}

	let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.expose()));

	cipher
		.decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad: name.as_bytes() })
		.map_err(|_| {
			Error::vault(format!(
				"Stored payload for `{name}` could not be decrypted; it was tampered with or sealed under another key."
			))
		})
}
