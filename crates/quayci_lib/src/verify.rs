use hmac::{
    digest::{generic_array::GenericArray, CtOutput},
    Hmac, Mac,
};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a `X-Hub-Signature-256` header (`sha256=<hex digest>`) against
/// the shared webhook secret. Runs before any payload parsing.
pub fn verify_signature(
    secret: &str,
    signature: Option<&str>,
    payload: &str,
) -> Result<(), actix_web::error::Error> {
    let Some(sig) = signature else {
        return Err(actix_web::error::ErrorUnauthorized(
            "Expected signature in header",
        ));
    };

    let Some(hex_digest) = sig.strip_prefix("sha256=") else {
        return Err(actix_web::error::ErrorUnauthorized(
            "Signature is not sha256",
        ));
    };

    let digest = hex::decode(hex_digest)
        .map_err(|_| actix_web::error::ErrorUnauthorized("Signature is not valid hex"))?;
    if digest.len() != 32 {
        return Err(actix_web::error::ErrorUnauthorized(
            "Signature has the wrong length",
        ));
    }

    log::trace!("Received sig: {:?}", digest);

    //have to wrap it to stop timing attacks on comparison
    let actual_signature = CtOutput::new(GenericArray::clone_from_slice(&digest));

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| actix_web::error::ErrorUnauthorized("Bad secret"))?;
    mac.update(payload.as_bytes());
    let computed_signature = mac.finalize();

    if actual_signature.ne(&computed_signature) {
        return Err(actix_web::error::ErrorUnauthorized(
            "Signature does not match!",
        ));
    };

    Ok(())
}
