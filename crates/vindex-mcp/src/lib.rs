//! vindex-mcp - MCP tool surface
//!
//! This crate exposes the index layer as tools for AI assistants. The
//! protocol transport itself lives outside this crate; tools are plain
//! structs with serde parameter types and a uniform result envelope.
//!
//! # Tools
//!
//! - `index_content` - Chunk, embed, and index a piece of content
//! - `index_query` - Search the index for similar chunks
//! - `index_status` - Report item count and collection name
//! - `index_delete_source` - Delete every chunk of one source
//! - `index_list_ids` - List all indexed chunk ids

mod server;

pub use server::{
    DeleteSourceParams, IndexContentParams, IndexToolServer, QueryParams, ServerInfo, ToolInfo,
    ToolResult,
};
