// --- Upload form ---

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FILE_FIELD: &str = "extension";

/// Multipart field carrying the name the upload is published under.
pub const UPLOAD_NAME_FIELD: &str = "extensionName";

/// Room for multipart boundaries and part headers on top of the payload limit.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

// --- Defaults ---

/// Default maximum size of an uploaded file (in bytes).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 5 * 1024 * 1024;

/// Default lifetime of an upload and default sweep interval (in seconds).
pub const DEFAULT_UPLOAD_TTL_SECS: u64 = 15 * 60;

// --- Responses ---

/// Body of `GET /extra/up`.
pub const UP_MESSAGE: &str = "If you see this, the server is up! The API should work fine.";

/// Page shown in the sign-in popup once the OAuth callback has completed.
pub const SIGNED_IN_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Signed in</title></head>
<body>
  <p>You are signed in. You can close this window.</p>
  <script>window.close();</script>
</body>
</html>"#;
