//! OpenAPI 3.0 type definitions
//!
//! Typed views of the document objects the client builder walks. Schemas
//! are deliberately left as raw JSON: they are read by the schema algebra
//! through their pointers, not through these structs.

use clientgen_common::{Pointer, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// A `$ref` to a `T` somewhere in the document
pub struct Reference<T> {
    pub ref_path: String,
    target: PhantomData<fn() -> T>,
}

impl<T> Reference<T> {
    pub fn new(ref_path: impl Into<String>) -> Self {
        Self {
            ref_path: ref_path.into(),
            target: PhantomData,
        }
    }

    /// Parse the reference as a local pointer
    pub fn pointer(&self) -> Result<Pointer> {
        Pointer::parse(&self.ref_path)
    }
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self::new(self.ref_path.clone())
    }
}

impl<T> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("ref_path", &self.ref_path)
            .finish()
    }
}

impl<'de, T> Deserialize<'de> for Reference<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RawReference {
            #[serde(rename = "$ref")]
            ref_path: String,
        }

        let raw = RawReference::deserialize(deserializer)?;
        Ok(Reference::new(raw.ref_path))
    }
}

/// Inline object or reference to one
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReferenceOr<T> {
    Reference(Reference<T>),
    Item(T),
}

/// OpenAPI document root
#[derive(Debug, Clone, Deserialize)]
pub struct OpenApiSpec {
    /// OpenAPI version (e.g., "3.0.3")
    pub openapi: String,

    /// API metadata
    pub info: Info,

    #[serde(default)]
    pub servers: Vec<Server>,

    /// API paths (endpoints), in document order
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,

    /// Reusable components
    #[serde(default)]
    pub components: Option<Components>,

    /// Default security requirement
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,

    /// Headers sent with every request
    #[serde(rename = "x-global-headers")]
    #[serde(default)]
    pub global_headers: Vec<ReferenceOr<Parameter>>,

    /// Responses any operation may produce
    #[serde(rename = "x-global-responses")]
    #[serde(default)]
    pub global_responses: IndexMap<String, ReferenceOr<Response>>,
}

/// API information
#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Server information
#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    /// Server URL, possibly templated (`https://{region}.example.com`)
    pub url: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub variables: IndexMap<String, ServerVariable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerVariable {
    pub default: String,

    #[serde(rename = "enum")]
    #[serde(default)]
    pub enum_values: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Operations for one path
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub get: Option<Operation>,
    #[serde(default)]
    pub put: Option<Operation>,
    #[serde(default)]
    pub post: Option<Operation>,
    #[serde(default)]
    pub delete: Option<Operation>,
    #[serde(default)]
    pub options: Option<Operation>,
    #[serde(default)]
    pub head: Option<Operation>,
    #[serde(default)]
    pub patch: Option<Operation>,
    #[serde(default)]
    pub trace: Option<Operation>,

    /// Parameters shared by every operation of the path
    #[serde(default)]
    pub parameters: Vec<ReferenceOr<Parameter>>,
}

impl PathItem {
    /// Operation declared under `method` (`get`, `post`, ...)
    pub fn operation(&self, method: &str) -> Option<&Operation> {
        match method {
            "get" => self.get.as_ref(),
            "put" => self.put.as_ref(),
            "post" => self.post.as_ref(),
            "delete" => self.delete.as_ref(),
            "options" => self.options.as_ref(),
            "head" => self.head.as_ref(),
            "patch" => self.patch.as_ref(),
            "trace" => self.trace.as_ref(),
            _ => None,
        }
    }
}

/// HTTP operation
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    /// Operation ID (unique identifier)
    #[serde(rename = "operationId")]
    #[serde(default)]
    pub operation_id: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub parameters: Vec<ReferenceOr<Parameter>>,

    #[serde(rename = "requestBody")]
    #[serde(default)]
    pub request_body: Option<ReferenceOr<RequestBody>>,

    /// Responses keyed by status (`200`, `4XX`, `default`)
    #[serde(default)]
    pub responses: IndexMap<String, ReferenceOr<Response>>,

    /// Overrides the document-level requirement; `[]` disables auth
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,
}

/// Scheme name → required scopes
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// Parameter definition
#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    /// Wire name
    pub name: String,

    /// Location: query, header, path, cookie
    #[serde(rename = "in")]
    pub location: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub style: Option<String>,

    #[serde(default)]
    pub explode: Option<bool>,

    /// Present when the parameter is described by a schema
    #[serde(default)]
    pub schema: Option<Value>,

    /// Present when the parameter is described by a media type
    #[serde(default)]
    pub content: Option<IndexMap<String, MediaType>>,

    /// Renaming hint for the generated signature
    #[serde(rename = "x-name")]
    #[serde(default)]
    pub name_hint: Option<String>,
}

/// Response header; a parameter without `name` and `in`
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub schema: Option<Value>,

    #[serde(default)]
    pub content: Option<IndexMap<String, MediaType>>,

    #[serde(rename = "x-name")]
    #[serde(default)]
    pub name_hint: Option<String>,
}

/// Request body
#[derive(Debug, Clone, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub description: Option<String>,

    /// Content types
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,

    #[serde(default)]
    pub required: bool,
}

/// Response
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub headers: IndexMap<String, ReferenceOr<Header>>,

    /// Content types
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Media type
#[derive(Debug, Clone, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<Value>,
}

/// Reusable components
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Components {
    /// Schemas, kept raw and read through pointers
    #[serde(default)]
    pub schemas: IndexMap<String, Value>,

    #[serde(rename = "securitySchemes")]
    #[serde(default)]
    pub security_schemes: IndexMap<String, ReferenceOr<SecurityScheme>>,
}

/// Security scheme definition
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityScheme {
    /// apiKey, http, oauth2 or openIdConnect
    #[serde(rename = "type")]
    pub scheme_type: String,

    #[serde(default)]
    pub description: Option<String>,

    /// apiKey: parameter name
    #[serde(default)]
    pub name: Option<String>,

    /// apiKey: query, header or cookie
    #[serde(rename = "in")]
    #[serde(default)]
    pub location: Option<String>,

    /// http: basic, bearer, ...
    #[serde(default)]
    pub scheme: Option<String>,

    #[serde(rename = "bearerFormat")]
    #[serde(default)]
    pub bearer_format: Option<String>,

    #[serde(default)]
    pub flows: Option<OAuthFlows>,

    #[serde(rename = "openIdConnectUrl")]
    #[serde(default)]
    pub open_id_connect_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthFlows {
    #[serde(default)]
    pub implicit: Option<OAuthFlow>,

    #[serde(default)]
    pub password: Option<OAuthFlow>,

    #[serde(rename = "clientCredentials")]
    #[serde(default)]
    pub client_credentials: Option<OAuthFlow>,

    #[serde(rename = "authorizationCode")]
    #[serde(default)]
    pub authorization_code: Option<OAuthFlow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthFlow {
    #[serde(rename = "authorizationUrl")]
    #[serde(default)]
    pub authorization_url: Option<String>,

    #[serde(rename = "tokenUrl")]
    #[serde(default)]
    pub token_url: Option<String>,

    #[serde(rename = "refreshUrl")]
    #[serde(default)]
    pub refresh_url: Option<String>,

    #[serde(default)]
    pub scopes: IndexMap<String, String>,
}
