// Collection names
pub const TOKEN_COLLECTION: &str = "api-token";
pub const TEST_CASE_COLLECTION: &str = "test_case";
pub const LAB_COLLECTION: &str = "lab";
pub const DAILY_STATS_COLLECTION: &str = "daily-stats";

// Common document keys
pub const ID_KEY: &str = "_id";
pub const CREATED_KEY: &str = "created_on";
pub const VERSION_KEY: &str = "version";
pub const NAME_KEY: &str = "name";
pub const EMAIL_KEY: &str = "email";

// Token keys
pub const TOKEN_KEY: &str = "token";
pub const USERNAME_KEY: &str = "username";
pub const EXPIRES_KEY: &str = "expires_on";
pub const EXPIRED_KEY: &str = "expired";
pub const IP_ADDRESS_KEY: &str = "ip_address";
pub const PROPERTIES_KEY: &str = "properties";
pub const ADMIN_KEY: &str = "admin";
pub const SUPERUSER_KEY: &str = "superuser";
pub const GET_KEY: &str = "get";
pub const POST_KEY: &str = "post";
pub const PUT_KEY: &str = "put";
pub const DELETE_KEY: &str = "delete";
pub const IP_RESTRICTED_KEY: &str = "ip_restricted";
pub const LAB_KEY: &str = "lab";
pub const TEST_LAB_KEY: &str = "test_lab";
pub const UPLOAD_KEY: &str = "upload";

// Test case keys
pub const TEST_GROUP_ID_KEY: &str = "test_group_id";
pub const STATUS_KEY: &str = "status";
pub const TIME_KEY: &str = "time";
pub const DEFINITION_URI_KEY: &str = "definition_uri";
pub const VCS_COMMIT_KEY: &str = "vcs_commit";
pub const KVM_GUEST_KEY: &str = "kvm_guest";
pub const INDEX_KEY: &str = "index";
pub const MEASUREMENTS_KEY: &str = "measurements";
pub const PARAMETERS_KEY: &str = "parameters";

// Lab keys
pub const CONTACT_KEY: &str = "contact";
pub const SURNAME_KEY: &str = "surname";
pub const TELEPHONE_KEY: &str = "telephone";
pub const MOBILE_KEY: &str = "mobile";
pub const AFFILIATION_KEY: &str = "affiliation";
pub const ADDRESS_KEY: &str = "address";
pub const PRIVATE_KEY: &str = "private";
pub const DESCRIPTION_KEY: &str = "description";

// Batch keys
pub const BATCH_KEY: &str = "batch";
pub const METHOD_KEY: &str = "method";
pub const RESOURCE_KEY: &str = "resource";
pub const DOCUMENT_KEY: &str = "document";
pub const QUERY_KEY: &str = "query";
pub const OPERATION_ID_KEY: &str = "operation_id";

// List query parameters
pub const LIMIT_KEY: &str = "limit";
pub const SKIP_KEY: &str = "skip";

/// Schema version written on new documents.
pub const SCHEMA_VERSION: &str = "1.0";
