//! Form schemas of the deploy endpoints
//!
//! These only describe the request bodies in the OpenAPI document; the
//! handlers read the fields straight from the multipart stream.

use utoipa::ToSchema;

/// Form of `POST /upload-only`
#[derive(Debug, ToSchema)]
pub struct UploadOnlyForm {
    /// ZIP archive to extract
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Directory to extract into, created if missing
    #[schema(example = "/srv/www/site")]
    pub target: String,
}

/// Form of `POST /upload-script`
#[derive(Debug, ToSchema)]
pub struct UploadScriptForm {
    /// ZIP archive to extract
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Directory to extract into, also the script's working directory
    #[schema(example = "/srv/www/site")]
    pub target: String,
    /// Shell command run after extraction
    #[schema(example = "npm ci && npm run build")]
    pub script: String,
}

/// Form of `POST /run-script`, multipart or URL-encoded
#[derive(Debug, ToSchema)]
pub struct RunScriptForm {
    /// Shell command to run
    #[schema(example = "ls -la")]
    pub script: String,
    /// Working directory, the configured script directory when omitted
    pub target: Option<String>,
}

/// Form of `POST /upload`
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// Archive to extract, its name must end in `.zip`
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Directory to extract into, the configured upload directory when omitted
    pub target: Option<String>,
    /// Shell command run after extraction
    pub script: Option<String>,
}
