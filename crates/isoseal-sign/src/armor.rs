//! ASCII-armored container for keyring signatures.
//!
//! ```text
//! -----BEGIN ISOSEAL SIGNATURE-----
//! Signer: release@example.org
//! Algorithm: ed25519ph
//! Key-Fingerprint: 3f2a9c0d1e4b5a67
//! Covered-Bytes: 10485760
//!
//! <base64 signature>
//! -----END ISOSEAL SIGNATURE-----
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

pub const BEGIN: &str = "-----BEGIN ISOSEAL SIGNATURE-----";
pub const END: &str = "-----END ISOSEAL SIGNATURE-----";
pub const ALGORITHM: &str = "ed25519ph";
pub const SIGNATURE_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArmorError {
    #[error("missing BEGIN line")]
    MissingBegin,
    #[error("missing END line")]
    MissingEnd,
    #[error("missing '{0}' header")]
    MissingHeader(&'static str),
    #[error("malformed header line '{0}'")]
    BadHeader(String),
    #[error("unsupported algorithm '{0}'")]
    UnsupportedAlgorithm(String),
    #[error("signature body is not valid base64")]
    BadBase64,
    #[error("signature is {0} bytes, expected {SIGNATURE_LENGTH}")]
    BadLength(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmoredSignature {
    pub signer:        String,
    pub fingerprint:   String,
    pub covered_bytes: u64,
    pub signature:     [u8; SIGNATURE_LENGTH],
}

impl ArmoredSignature {
    pub fn encode(&self) -> String {
        let body = STANDARD.encode(self.signature);
        let mut out = String::new();
        out.push_str(BEGIN);
        out.push('\n');
        out.push_str(&format!("Signer: {}\n", self.signer));
        out.push_str(&format!("Algorithm: {ALGORITHM}\n"));
        out.push_str(&format!("Key-Fingerprint: {}\n", self.fingerprint));
        out.push_str(&format!("Covered-Bytes: {}\n", self.covered_bytes));
        out.push('\n');
        // 64 columns, like PGP armor.
        for line in body.as_bytes().chunks(64) {
            out.push_str(&String::from_utf8_lossy(line));
            out.push('\n');
        }
        out.push_str(END);
        out.push('\n');
        out
    }

    pub fn parse(text: &str) -> Result<Self, ArmorError> {
        let mut lines = text.lines().map(str::trim).skip_while(|l| l.is_empty());
        if lines.next() != Some(BEGIN) {
            return Err(ArmorError::MissingBegin);
        }

        let mut signer = None;
        let mut algorithm = None;
        let mut fingerprint = None;
        let mut covered = None;
        for line in lines.by_ref() {
            if line.is_empty() {
                break;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| ArmorError::BadHeader(line.to_string()))?;
            let value = value.trim().to_string();
            match key.trim() {
                "Signer" => signer = Some(value),
                "Algorithm" => algorithm = Some(value),
                "Key-Fingerprint" => fingerprint = Some(value),
                "Covered-Bytes" => {
                    covered = Some(value.parse::<u64>().map_err(|_| ArmorError::BadHeader(line.to_string()))?)
                }
                // Unknown headers are tolerated for forward compatibility.
                _ => {}
            }
        }

        let mut body = String::new();
        let mut ended = false;
        for line in lines {
            if line == END {
                ended = true;
                break;
            }
            body.push_str(line);
        }
        if !ended {
            return Err(ArmorError::MissingEnd);
        }

        let algorithm = algorithm.ok_or(ArmorError::MissingHeader("Algorithm"))?;
        if algorithm != ALGORITHM {
            return Err(ArmorError::UnsupportedAlgorithm(algorithm));
        }

        let raw = STANDARD.decode(body.as_bytes()).map_err(|_| ArmorError::BadBase64)?;
        let signature: [u8; SIGNATURE_LENGTH] =
            raw.as_slice().try_into().map_err(|_| ArmorError::BadLength(raw.len()))?;

        Ok(Self {
            signer: signer.ok_or(ArmorError::MissingHeader("Signer"))?,
            fingerprint: fingerprint.ok_or(ArmorError::MissingHeader("Key-Fingerprint"))?,
            covered_bytes: covered.ok_or(ArmorError::MissingHeader("Covered-Bytes"))?,
            signature,
        })
    }
}
