//! Classifying a poll response into one of a closed set of shapes.
//!
//! Services encode completion three ways: a bare 202 that always means "not
//! yet", an empty 200/204 that means "done", and a JSON body with a `status`
//! field. A Location poll may also answer with the finished resource itself.

use serde::Deserialize;

use crate::error::PollError;
use crate::http::HttpResponse;
use crate::status::ErrorDetail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// HTTP 202; the body is not inspected.
    Accepted,
    /// HTTP 200/201/204 with nothing to parse.
    EmptySuccess,
    /// A JSON body carrying `status`.
    StatusPayload {
        status: String,
        error: Option<ErrorDetail>,
    },
    /// A JSON body without `status`, taken as the final resource.
    ResourceBody,
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

pub fn classify(response: &HttpResponse) -> Result<ResponseShape, PollError> {
    match response.status {
        202 => Ok(ResponseShape::Accepted),
        204 => Ok(ResponseShape::EmptySuccess),
        200 | 201 if !response.has_body() => Ok(ResponseShape::EmptySuccess),
        200 | 201 => {
            if !is_json(response.content_type()) {
                return Err(PollError::UnexpectedContentType {
                    status: response.status,
                    content_type: response.content_type().map(str::to_string),
                });
            }
            let envelope: StatusEnvelope =
                serde_json::from_reader(response.body_reader()).map_err(PollError::Deserialization)?;
            Ok(match envelope.status {
                Some(status) => ResponseShape::StatusPayload {
                    status,
                    error: envelope.error,
                },
                None => ResponseShape::ResourceBody,
            })
        }
        status => Err(PollError::UnexpectedStatus {
            status,
            body: response.body_text(),
        }),
    }
}

/// `application/json` and any `+json` structured suffix.
pub(crate) fn is_json(content_type: Option<&str>) -> bool {
    let Some(parsed) = content_type.and_then(|ct| ct.parse::<mime::Mime>().ok()) else {
        return false;
    };
    parsed.subtype() == mime::JSON || parsed.suffix() == Some(mime::JSON)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status)
            .with_header("Content-Type", "application/json; charset=utf-8")
            .with_body(body.to_string())
    }

    #[test]
    fn accepted_ignores_body() {
        assert_eq!(classify(&HttpResponse::new(202)).unwrap(), ResponseShape::Accepted);
        assert_eq!(classify(&json(202, r#"{"status":"Failed"}"#)).unwrap(), ResponseShape::Accepted);
    }

    #[test]
    fn empty_success_codes() {
        for status in [200, 201, 204] {
            assert_eq!(classify(&HttpResponse::new(status)).unwrap(), ResponseShape::EmptySuccess);
        }
    }

    #[test]
    fn status_payload_keeps_error_detail() {
        let shape = classify(&json(
            200,
            r#"{"status":"Failed","error":{"code":"QuotaExceeded","message":"no cores left"}}"#,
        ))
        .unwrap();
        assert_eq!(
            shape,
            ResponseShape::StatusPayload {
                status: "Failed".to_string(),
                error: Some(ErrorDetail {
                    code: Some("QuotaExceeded".to_string()),
                    message: Some("no cores left".to_string()),
                }),
            }
        );
    }

    #[test]
    fn json_without_status_is_a_resource() {
        let shape = classify(&json(200, r#"{"id":"/resources/a","name":"a"}"#)).unwrap();
        assert_eq!(shape, ResponseShape::ResourceBody);
    }

    #[test]
    fn plain_text_body_is_a_protocol_error() {
        let response = HttpResponse::new(200)
            .with_header("Content-Type", "text/plain")
            .with_body("done");
        let err = classify(&response).unwrap_err();
        assert!(matches!(
            err,
            PollError::UnexpectedContentType { status: 200, content_type: Some(ref ct) } if ct == "text/plain"
        ));
    }

    #[test]
    fn malformed_json_is_a_protocol_error() {
        let err = classify(&json(200, "{not json")).unwrap_err();
        assert!(matches!(err, PollError::Deserialization(_)));
    }

    #[test]
    fn other_status_codes_are_rejected() {
        let err = classify(&HttpResponse::new(500).with_body("boom")).unwrap_err();
        assert!(matches!(err, PollError::UnexpectedStatus { status: 500, ref body } if body == "boom"));
    }

    #[test]
    fn recognises_json_suffixes() {
        assert!(is_json(Some("application/json")));
        assert!(is_json(Some("application/problem+json")));
        assert!(!is_json(Some("text/plain")));
        assert!(!is_json(None));
    }
}
