// Decides what a response means: payload, empty result, service error or
// transport failure
use crate::error::{CheddarError, Result, TransportError};
use crate::node::{parse_numeric, Node};
use crate::normalize::{normalize, Document, TEXT_KEY};
use crate::transport::TransportResponse;

const XML_DECLARATION: &[u8] = b"<?xml";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// Numeric reading of a text or number field
fn numeric_field(node: Option<&Node>) -> Option<i64> {
    match node? {
        Node::Integer(value) => Some(*value),
        Node::Text(text) => match parse_numeric(text)? {
            Node::Integer(value) => Some(value),
            _ => None,
        },
        _ => None,
    }
}

fn text_field(node: Option<&Node>) -> Option<String> {
    match node? {
        Node::Text(text) => Some(text.clone()),
        Node::Integer(value) => Some(value.to_string()),
        Node::Float(value) => Some(value.to_string()),
        _ => None,
    }
}

/// Builds the service error carried by an `<error>` document.
///
/// The message is the element text (the `_` field when the element also has
/// attributes or children), the code is the numeric `code` field.
pub fn service_error(content: &Node) -> CheddarError {
    match content {
        Node::Map(_) => CheddarError::ServiceError {
            message: text_field(content.get(TEXT_KEY)).unwrap_or_default(),
            code: numeric_field(content.get("code")),
            aux_code: numeric_field(content.get("auxCode")),
            id: text_field(content.get("id")).filter(|id| !id.is_empty()),
        },
        other => CheddarError::ServiceError {
            message: text_field(Some(other)).unwrap_or_default(),
            code: None,
            aux_code: None,
            id: None,
        },
    }
}

/// Classifies a normalized document by its root tag.
pub fn classify_document(document: Option<Document>) -> Result<Option<Node>> {
    match document {
        None => Ok(None),
        Some(document) if document.is_error() => Err(service_error(&document.content)),
        Some(document) => Ok(Some(document.content)),
    }
}

fn starts_with_declaration(body: &[u8]) -> bool {
    let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    body[start..].starts_with(XML_DECLARATION)
}

/// Classifies the outcome of one transport call.
///
/// A well-formed `<error>` document wins over the HTTP status: the service
/// sometimes reports business errors with a non-2xx status and an XML body.
/// Any other non-2xx answer is a transport error and is not parsed as a
/// payload.
pub fn classify_response(
    outcome: std::result::Result<TransportResponse, TransportError>,
) -> Result<Option<Node>> {
    let response = outcome?;

    if response.is_success() {
        return classify_document(normalize(&response.body)?);
    }

    let status_failure = || TransportError::HttpStatus {
        status_code: response.status_code,
        body: String::from_utf8_lossy(&response.body).into_owned(),
    };

    if !starts_with_declaration(&response.body) {
        return Err(status_failure().into());
    }

    match normalize(&response.body) {
        Ok(Some(document)) if document.is_error() => Err(service_error(&document.content)),
        _ => Err(status_failure().into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const ERROR_WITH_ATTRIBUTES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<error id="73542" code="404" auxCode="">Customer not found</error>"#;

    const ERROR_WITH_CHILDREN: &str =
        r#"<?xml version="1.0"?><error><code>404</code><_>Customer not found</_></error>"#;

    fn ok(body: &str) -> std::result::Result<TransportResponse, TransportError> {
        Ok(TransportResponse::new(200, body.to_string()))
    }

    fn status(code: u16, body: &str) -> std::result::Result<TransportResponse, TransportError> {
        Ok(TransportResponse::new(code, body.to_string()))
    }

    fn assert_customer_not_found(result: Result<Option<Node>>) {
        match result {
            Err(CheddarError::ServiceError { message, code, .. }) => {
                assert_eq!(message, "Customer not found");
                assert_eq!(code, Some(404));
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[test_case(ERROR_WITH_ATTRIBUTES, 200; "attribute form with 200")]
    #[test_case(ERROR_WITH_ATTRIBUTES, 404; "attribute form with 404")]
    #[test_case(ERROR_WITH_CHILDREN, 200; "child form with 200")]
    #[test_case(ERROR_WITH_CHILDREN, 404; "child form with 404")]
    #[test_case(ERROR_WITH_CHILDREN, 500; "child form with 500")]
    fn test_error_document_wins_over_status(body: &str, status_code: u16) {
        assert_customer_not_found(classify_response(status(status_code, body)));
    }

    #[test]
    fn test_service_error_keeps_id_and_aux_code() {
        let body = r#"<error id="abc" code="412" auxCode="6000">A value is required</error>"#;
        match classify_response(ok(body)) {
            Err(CheddarError::ServiceError {
                message,
                code,
                aux_code,
                id,
            }) => {
                assert_eq!(message, "A value is required");
                assert_eq!(code, Some(412));
                assert_eq!(aux_code, Some(6000));
                assert_eq!(id.as_deref(), Some("abc"));
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_error_text() {
        match classify_response(ok("<error>Authentication required</error>")) {
            Err(CheddarError::ServiceError { message, code, .. }) => {
                assert_eq!(message, "Authentication required");
                assert_eq!(code, None);
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[test]
    fn test_success_returns_content() {
        let content = classify_response(ok("<plans><plan code=\"PRO\"/></plans>"))
            .unwrap()
            .unwrap();
        assert_eq!(content[0]["code"].as_str(), Some("PRO"));
    }

    #[test]
    fn test_empty_success_is_none() {
        assert_eq!(classify_response(ok("")).unwrap(), None);
    }

    #[test]
    fn test_malformed_success_body() {
        assert!(matches!(
            classify_response(ok("<plans><plan></plans>")),
            Err(CheddarError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_network_failure_is_transport_error() {
        let outcome = Err(TransportError::NetworkError("connection reset".to_string()));
        match classify_response(outcome) {
            Err(CheddarError::TransportError(TransportError::NetworkError(message))) => {
                assert_eq!(message, "connection reset");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test_case(502, "<html>Bad Gateway</html>"; "html body")]
    #[test_case(500, "<error code=\"500\">Oops</error>"; "error document without declaration")]
    #[test_case(500, "<?xml version=\"1.0\"?><error><code>500"; "truncated xml")]
    #[test_case(503, "<?xml version=\"1.0\"?><customers/>"; "non error root")]
    #[test_case(401, ""; "empty body")]
    fn test_non_success_without_error_document(status_code: u16, body: &str) {
        match classify_response(status(status_code, body)) {
            Err(CheddarError::TransportError(TransportError::HttpStatus {
                status_code: got,
                body: got_body,
            })) => {
                assert_eq!(got, status_code);
                assert_eq!(got_body, body);
            }
            other => panic!("expected status failure, got {other:?}"),
        }
    }

    #[test]
    fn test_declaration_after_bom_and_whitespace() {
        let body = format!("\u{feff}\n  {ERROR_WITH_CHILDREN}");
        assert_customer_not_found(classify_response(status(404, &body)));
    }

    #[test]
    fn test_classify_document_directly() {
        let doc = normalize(ERROR_WITH_CHILDREN.as_bytes()).unwrap();
        assert_customer_not_found(classify_document(doc));
        assert_eq!(classify_document(None).unwrap(), None);
    }
}
