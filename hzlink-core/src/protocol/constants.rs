//! Protocol constants for the version 1.x binary client protocol.

/// Size of a byte field in bytes.
pub const BYTE_SIZE_IN_BYTES: usize = 1;

/// Size of a boolean field in bytes.
pub const BOOLEAN_SIZE_IN_BYTES: usize = 1;

/// Size of a short field in bytes.
pub const SHORT_SIZE_IN_BYTES: usize = 2;

/// Size of an int field in bytes.
pub const INT_SIZE_IN_BYTES: usize = 4;

/// Size of a long field in bytes.
pub const LONG_SIZE_IN_BYTES: usize = 8;

/// Protocol version written into every outgoing header.
pub const VERSION: u8 = 0;

/// Begin flag - first frame of a message.
pub const BEGIN_FLAG: u8 = 0x80;

/// End flag - last frame of a message.
pub const END_FLAG: u8 = 0x40;

/// Both begin and end set: a single-frame message.
pub const BEGIN_END_FLAG: u8 = BEGIN_FLAG | END_FLAG;

/// Listener flag - set by the member on event frames.
pub const LISTENER_FLAG: u8 = 0x01;

/// Offset of the frame length field.
pub const FRAME_LENGTH_FIELD_OFFSET: usize = 0;

/// Offset of the version field.
pub const VERSION_FIELD_OFFSET: usize = FRAME_LENGTH_FIELD_OFFSET + INT_SIZE_IN_BYTES;

/// Offset of the flags field.
pub const FLAGS_FIELD_OFFSET: usize = VERSION_FIELD_OFFSET + BYTE_SIZE_IN_BYTES;

/// Offset of the message type field.
pub const TYPE_FIELD_OFFSET: usize = FLAGS_FIELD_OFFSET + BYTE_SIZE_IN_BYTES;

/// Offset of the correlation id field.
pub const CORRELATION_ID_FIELD_OFFSET: usize = TYPE_FIELD_OFFSET + SHORT_SIZE_IN_BYTES;

/// Offset of the partition id field.
pub const PARTITION_ID_FIELD_OFFSET: usize = CORRELATION_ID_FIELD_OFFSET + LONG_SIZE_IN_BYTES;

/// Offset of the data offset field.
pub const DATA_OFFSET_FIELD_OFFSET: usize = PARTITION_ID_FIELD_OFFSET + INT_SIZE_IN_BYTES;

/// Total header size; the payload starts here.
pub const HEADER_SIZE: usize = DATA_OFFSET_FIELD_OFFSET + SHORT_SIZE_IN_BYTES;

/// Partition ID meaning "no specific partition".
pub const PARTITION_ID_NONE: i32 = -1;

/// Preamble written right after the TCP connect, before any frame.
pub const CLIENT_BINARY_PROTOCOL: &[u8; 3] = b"CB2";

/// Correlation id reserved for the authentication handshake.
pub const AUTHENTICATION_CORRELATION_ID: i64 = 1;

/// Seed for the partition hash.
pub const PARTITION_HASH_SEED: i32 = 0x0100_0193;

// Request message types.

/// Client authentication request.
pub const CLIENT_AUTHENTICATION: u16 = 0x0002;

/// Create distributed object proxy request.
pub const CLIENT_CREATE_PROXY: u16 = 0x0005;

/// Destroy distributed object proxy request.
pub const CLIENT_DESTROY_PROXY: u16 = 0x0006;

/// Partition table request.
pub const CLIENT_GET_PARTITIONS: u16 = 0x0008;

/// Heartbeat ping request.
pub const CLIENT_PING: u16 = 0x000f;

/// Queue put request.
pub const QUEUE_PUT: u16 = 0x0302;

/// Queue poll request.
pub const QUEUE_POLL: u16 = 0x0305;

/// Queue clear request.
pub const QUEUE_CLEAR: u16 = 0x030f;

/// Queue add item listener request.
pub const QUEUE_ADD_LISTENER: u16 = 0x0311;

// Response and event message types.

/// Void (success acknowledgement) response.
pub const VOID_RESPONSE: u16 = 0x0064;

/// Boolean response.
pub const BOOLEAN_RESPONSE: u16 = 0x0065;

/// String response.
pub const STRING_RESPONSE: u16 = 0x0068;

/// Nullable data response.
pub const DATA_RESPONSE: u16 = 0x0069;

/// Authentication response.
pub const AUTHENTICATION_RESPONSE: u16 = 0x006b;

/// Partition table response.
pub const PARTITIONS_RESPONSE: u16 = 0x006c;

/// Exception response.
pub const EXCEPTION_RESPONSE: u16 = 0x006d;

/// Item listener event.
pub const ITEM_EVENT: u16 = 0x00cc;

/// Service name of the distributed queue.
pub const QUEUE_SERVICE_NAME: &str = "hz:impl:queueService";
