// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font signing keys: ECDSA P-256 key pairs used to sign font files and to
// verify those signatures before a file is given an integrity mark.

use fontlayer_core::error::FontLayerError;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1, ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair,
    UnparsedPublicKey,
};
use tracing::{debug, instrument};

/// An ECDSA P-256 signing key for font publishers.
///
/// The private key is stored as a PKCS#8 v1 DER document.  The public key is
/// the uncompressed SEC1 encoding (0x04 || x || y, 65 bytes), which is the
/// form the mark registry trusts.
pub struct SigningKeyPair {
    pkcs8_der: Vec<u8>,
    public_key: Vec<u8>,
}

impl SigningKeyPair {
    /// Generate a fresh key pair using the OS CSPRNG.
    #[instrument]
    pub fn generate() -> Result<Self, FontLayerError> {
        let rng = SystemRandom::new();

        let pkcs8_document = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
            .map_err(|e| FontLayerError::Signature(format!("key generation failed: {e}")))?;

        let pair = Self::from_pkcs8(pkcs8_document.as_ref())?;
        debug!(pubkey_len = pair.public_key.len(), "ECDSA P-256 key pair generated");
        Ok(pair)
    }

    /// Load a key pair from PKCS#8 v1 DER bytes.
    pub fn from_pkcs8(pkcs8_der: &[u8]) -> Result<Self, FontLayerError> {
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8_der, &rng)
            .map_err(|e| FontLayerError::Signature(format!("key parsing failed: {e}")))?;

        Ok(Self {
            pkcs8_der: pkcs8_der.to_vec(),
            public_key: key_pair.public_key().as_ref().to_vec(),
        })
    }

    /// The PKCS#8 v1 DER-encoded private key.
    pub fn private_key_pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }

    /// The uncompressed SEC1 public key (65 bytes).
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Sign `message` (ECDSA P-256 + SHA-256, ASN.1 DER signature).
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, FontLayerError> {
        let rng = SystemRandom::new();

        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &self.pkcs8_der, &rng)
                .map_err(|e| FontLayerError::Signature(format!("key load failed: {e}")))?;

        let sig = key_pair
            .sign(&rng, message)
            .map_err(|e| FontLayerError::Signature(format!("signing failed: {e}")))?;

        Ok(sig.as_ref().to_vec())
    }
}

/// Check `signature` over `message` against a SEC1 public key.
pub fn verify_signature(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), FontLayerError> {
    UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, public_key)
        .verify(message, signature)
        .map_err(|_| FontLayerError::Signature("signature does not match".into()))
}
