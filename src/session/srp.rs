//! SRP 2FA proof for `auth.checkPassword`.
//!
//! The plaintext password never leaves the process: it is stretched with the
//! server-supplied salts, combined with the server's public value `g_b` and a
//! fresh client secret `a`, and only the resulting `(g_a, M1)` pair is sent.

use num_bigint::{BigInt, Sign};
use num_traits::ops::euclid::Euclid;
use sha2::{Digest, Sha256, Sha512};

use crate::error::AuthError;
use crate::rpc::{PasswordKdfAlgo, PasswordParams, PasswordProof};

/// Size of SRP numbers on the wire
pub(crate) const SRP_BYTES: usize = 256;

const PBKDF2_ROUNDS: u32 = 100_000;

/// Build the password proof from the account's 2FA parameters.
///
/// `secret` is the client's random exponent `a`, 256 bytes of fresh randomness.
pub(crate) fn password_proof(
    params: &PasswordParams,
    password: &[u8],
    secret: &[u8; SRP_BYTES],
) -> Result<PasswordProof, AuthError> {
    let algo = params
        .current_algo
        .as_ref()
        .ok_or(AuthError::PasswordNotConfigured)?;
    let PasswordKdfAlgo::Sha256Sha256Pbkdf2Sha512ModPow { salt1, salt2, g, p } = algo else {
        return Err(AuthError::UnsupportedPasswordAlgorithm);
    };
    let g_b = params.srp_b.as_deref().ok_or_else(|| {
        AuthError::Rpc(crate::error::InvocationError::Unexpected(
            "password parameters carry no srp_b".into(),
        ))
    })?;
    let srp_id = params.srp_id.ok_or_else(|| {
        AuthError::Rpc(crate::error::InvocationError::Unexpected(
            "password parameters carry no srp_id".into(),
        ))
    })?;

    let (m1, g_a) = compute(salt1, salt2, p, *g, g_b, secret, password);
    Ok(PasswordProof {
        srp_id,
        a: g_a.to_vec(),
        m1: m1.to_vec(),
    })
}

/// Compute `(M1, g_a)`.
fn compute(
    salt1: &[u8],
    salt2: &[u8],
    p: &[u8],
    g: i32,
    g_b: &[u8],
    a: &[u8],
    password: &[u8],
) -> ([u8; 32], [u8; SRP_BYTES]) {
    let p_int = uint(p);
    let g_int = BigInt::from(g);
    let g_padded = pad(&g_int.to_bytes_be().1);
    let g_b = pad(g_b);
    let a_int = uint(&pad(a));

    let g_a = pad(&g_int.modpow(&a_int, &p_int).to_bytes_be().1);

    let k = uint(&sha256(&[p, &g_padded]));
    let u = uint(&sha256(&[&g_a, &g_b]));
    let x = uint(&password_hash(password, salt1, salt2));

    let v = g_int.modpow(&x, &p_int);
    let kv = (k * v) % &p_int;
    let t = (uint(&g_b) - kv).rem_euclid(&p_int);
    let s_a = t.modpow(&(a_int + u * x), &p_int);
    let k_a = sha256(&[&pad(&s_a.to_bytes_be().1)]);

    let mut p_xor_g = sha256(&[p]);
    for (byte, other) in p_xor_g.iter_mut().zip(sha256(&[&g_padded])) {
        *byte ^= other;
    }
    let m1 = sha256(&[
        &p_xor_g,
        &sha256(&[salt1]),
        &sha256(&[salt2]),
        &g_a,
        &g_b,
        &k_a,
    ]);

    (m1, g_a)
}

/// `PH2(password, salt1, salt2)`
fn password_hash(password: &[u8], salt1: &[u8], salt2: &[u8]) -> [u8; 32] {
    let ph1 = salted(&salted(password, salt1), salt2);
    let mut stretched = [0u8; 64];
    pbkdf2::pbkdf2_hmac::<Sha512>(&ph1, salt1, PBKDF2_ROUNDS, &mut stretched);
    salted(&stretched, salt2)
}

/// `SH(data, salt) = H(salt | data | salt)`
fn salted(data: &[u8], salt: &[u8]) -> [u8; 32] {
    sha256(&[salt, data, salt])
}

fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn uint(bytes: &[u8]) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, bytes)
}

/// Left-pad (or keep the low 256 bytes of) a big-endian number
fn pad(data: &[u8]) -> [u8; SRP_BYTES] {
    let mut out = [0u8; SRP_BYTES];
    let data = &data[data.len().saturating_sub(SRP_BYTES)..];
    out[SRP_BYTES - data.len()..].copy_from_slice(data);
    out
}
