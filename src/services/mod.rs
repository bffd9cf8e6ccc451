// Identifier issuance shared by every entity kind
pub mod sequencer;

// Catalog and customer collaborators
pub mod catalog;
pub mod customers;

// Payment-proof storage
pub mod attachments;

// Cart and checkout
pub mod commerce;

// Administrative order lifecycle
pub mod order_status;
