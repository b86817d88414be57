//! Header names and content types shared by the dialect and the backend.

/// Header that marks a request as a dialect request.
pub const CDMI_VERSION: &str = "x-cdmi-specification-version";
/// Client-supplied correlator for a partial upload sequence.
pub const CDMI_UPLOAD_ID: &str = "x-cdmi-uploadid";
/// Partial upload flag: `true`, or `false[;count=N]` on the final request.
pub const CDMI_PARTIAL: &str = "x-cdmi-partial";

/// Dialect container representation.
pub const CDMI_CONTAINER: &str = "application/cdmi-container";
/// Dialect data object representation.
pub const CDMI_OBJECT: &str = "application/cdmi-object";
/// Dialect capability representation.
pub const CDMI_CAPABILITY: &str = "application/cdmi-capability";
/// Multi-part body carrying an envelope part and a value part.
pub const MULTIPART_MIXED: &str = "multipart/mixed";
/// Plain JSON, used for backend listings.
pub const APPLICATION_JSON: &str = "application/json";
/// Content type of dialect container reads.
pub const JSON_UTF8: &str = "application/json; charset=UTF-8";

/// Backend auth token header.
pub const AUTH_TOKEN: &str = "x-auth-token";
/// Backend storage token header, returned on login.
pub const STORAGE_TOKEN: &str = "x-storage-token";
/// Backend storage URL header, returned on login.
pub const STORAGE_URL: &str = "x-storage-url";

/// Content type the backend uses for directory marker objects.
pub const DIRECTORY_MARKER: &str = "application/directory";
/// Metadata header prefix for top-level containers.
pub const CONTAINER_META_PREFIX: &str = "x-container-meta-cdmi-";
/// Metadata header prefix for objects, including nested directory markers.
pub const OBJECT_META_PREFIX: &str = "x-object-meta-cdmi-";
/// Backend-native container metadata prefix (non-dialect passthrough).
pub const NATIVE_CONTAINER_META_PREFIX: &str = "x-container-meta-";
/// Backend-native object metadata prefix (non-dialect passthrough).
pub const NATIVE_OBJECT_META_PREFIX: &str = "x-object-meta-";
/// Stored value transfer encoding of an object.
pub const VALUE_ENCODING: &str = "x-object-meta-valuetransferencoding";
/// Large-object manifest header naming the segment prefix.
pub const OBJECT_MANIFEST: &str = "x-object-manifest";
/// Server-side copy source.
pub const COPY_FROM: &str = "x-copy-from";

/// Transfer encoding marker for base64 values.
pub const ENCODING_BASE64: &str = "base64";
/// Default transfer encoding.
pub const ENCODING_UTF8: &str = "utf-8";
