// Request construction: path rendering, encoding and authentication headers
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::{ClientConfig, Credentials};
use crate::form::FormData;

pub const XML_PREFIX: &str = "/xml";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";

// Characters a URI may not carry literally. Reserved delimiters stay as they
// are, except '?' and '#' which would cut the path short.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// An action on a resource, rendered as
/// `/<resource>/<action>[/<scope>/<value>]/productCode/<code>[/<key>/<value>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    resource: String,
    action: String,
    scope: Vec<(String, String)>,
    params: Vec<(String, String)>,
}

impl ResourcePath {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            scope: Vec::new(),
            params: Vec::new(),
        }
    }

    // Segment placed before the product code
    pub fn scope(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.scope.push((key.into(), value.to_string()));
        self
    }

    // Segment placed after the product code
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn render(&self, product_code: &str) -> String {
        let mut path = format!("/{}/{}", self.resource, self.action);
        for (key, value) in &self.scope {
            path.push_str(&format!("/{key}/{value}"));
        }
        path.push_str(&format!("/productCode/{product_code}"));
        for (key, value) in &self.params {
            path.push_str(&format!("/{key}/{value}"));
        }
        path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiPath {
    // Used verbatim; the caller supplies the product code
    Raw(String),
    Resource(ResourcePath),
}

impl ApiPath {
    pub fn render(&self, product_code: &str) -> String {
        match self {
            ApiPath::Raw(path) if path.starts_with('/') => path.clone(),
            ApiPath::Raw(path) => format!("/{path}"),
            ApiPath::Resource(resource) => resource.render(product_code),
        }
    }
}

impl From<&str> for ApiPath {
    fn from(path: &str) -> Self {
        ApiPath::Raw(path.to_string())
    }
}

impl From<String> for ApiPath {
    fn from(path: String) -> Self {
        ApiPath::Raw(path)
    }
}

impl From<ResourcePath> for ApiPath {
    fn from(path: ResourcePath) -> Self {
        ApiPath::Resource(path)
    }
}

/// Input of a low-level call: a path plus optional form data.
///
/// A bare path converts directly (`"/plans/get/productCode/P".into()`),
/// which means the call sends no body. Data is attached explicitly with
/// [`ApiRequest::with_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub path: ApiPath,
    pub data: Option<FormData>,
}

impl ApiRequest {
    pub fn new(path: impl Into<ApiPath>) -> Self {
        Self {
            path: path.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: FormData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_optional_data(mut self, data: Option<FormData>) -> Self {
        self.data = data;
        self
    }
}

impl From<&str> for ApiRequest {
    fn from(path: &str) -> Self {
        ApiRequest::new(path)
    }
}

impl From<String> for ApiRequest {
    fn from(path: String) -> Self {
        ApiRequest::new(path)
    }
}

impl From<ResourcePath> for ApiRequest {
    fn from(path: ResourcePath) -> Self {
        ApiRequest::new(path)
    }
}

/// Everything the transport needs to send one POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub scheme: &'static str,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestDescriptor {
    pub fn url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

/// Builds the authenticated request for one call.
pub fn build_request(
    credentials: &Credentials,
    config: &ClientConfig,
    request: &ApiRequest,
) -> RequestDescriptor {
    let path = request.path.render(credentials.product_code());

    let mut headers = vec![(
        AUTHORIZATION.to_string(),
        credentials.authorization().to_string(),
    )];

    let body = request.data.as_ref().map(|data| {
        let body = data.encode();
        headers.push((CONTENT_TYPE.to_string(), FORM_CONTENT_TYPE.to_string()));
        headers.push((CONTENT_LENGTH.to_string(), body.len().to_string()));
        body
    });

    RequestDescriptor {
        scheme: config.scheme(),
        host: config.host.clone(),
        port: config.port,
        path: format!("{XML_PREFIX}{}", encode_path(&path)),
        headers,
        body,
    }
}
