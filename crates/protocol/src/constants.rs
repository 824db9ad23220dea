//! Session status codes reported by the intake service.

/// The service is still processing the closed session. The only
/// non-terminal code.
pub const STATUS_PROCESSING: i32 = 150;

/// Every document in the session was processed.
pub const STATUS_SUCCESS: i32 = 200;

/// At least one document failed content validation.
pub const STATUS_INVALID_DOCUMENTS: i32 = 405;

/// The service could not decrypt the uploaded parts.
pub const STATUS_DECRYPTION_ERROR: i32 = 415;

/// The session declared more documents than allowed.
pub const STATUS_INVOICE_LIMIT_EXCEEDED: i32 = 420;

/// The wrapped symmetric key could not be unwrapped.
pub const STATUS_INVALID_WRAPPED_KEY: i32 = 430;

/// The initialization vector was malformed.
pub const STATUS_INVALID_IV: i32 = 435;
