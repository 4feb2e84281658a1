use crate::error::CoreError;
use crate::identity::{Claims, TokenDecoder};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Reads the payload segment of a JWT without checking its signature; the
/// server re-validates the token on every request, the client only needs the
/// claims to know who is signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtDecoder;

impl TokenDecoder for JwtDecoder {
    fn decode(&self, token: &str) -> Result<Claims, CoreError> {
        let mut parts = token.trim().split('.');
        let payload = match (parts.next(), parts.next()) {
            (Some(header), Some(payload)) if !header.is_empty() && !payload.is_empty() => payload,
            _ => {
                return Err(CoreError::Decode(
                    "token is not a header.payload.signature triple".into(),
                ));
            }
        };
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload);
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn decodes_username_and_subject() -> Result<(), CoreError> {
        let token = token_with(r#"{"username":"ann","sub":"6650aa","iat":1700000000}"#);
        let claims = JwtDecoder.decode(&token)?;
        assert_eq!(claims.username.as_deref(), Some("ann"));
        assert_eq!(claims.sub.as_deref(), Some("6650aa"));
        assert!(claims.other.contains_key("iat"));
        Ok(())
    }

    #[test]
    fn tolerates_padded_payloads() -> Result<(), CoreError> {
        let token = token_with(r#"{"username":"bo"}"#);
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1].push_str("==");
        let claims = JwtDecoder.decode(&parts.join("."))?;
        assert_eq!(claims.username.as_deref(), Some("bo"));
        Ok(())
    }

    #[test]
    fn malformed_tokens_are_decode_errors() {
        assert!(matches!(
            JwtDecoder.decode("not-a-token"),
            Err(CoreError::Decode(_))
        ));
        assert!(matches!(
            JwtDecoder.decode("a.!!!.c"),
            Err(CoreError::Decode(_))
        ));
        let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("plain text"));
        assert!(matches!(
            JwtDecoder.decode(&not_json),
            Err(CoreError::Decode(_))
        ));
    }
}
