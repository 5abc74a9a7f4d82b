//! # EasyChat Session
//!
//! Everything between the transport and the screen:
//! - [`ChoiceAssembler`] rebuilds one answer from its frames
//! - [`ConversationSession`] submits turns, renders answers, and rolls back failures
//! - [`resolve_link`] decides what a link in a rendered answer does
//! - [`DocumentViewer`] opens cited PDFs through the document cache

pub mod assembler;
pub mod links;
pub mod session;
pub mod viewer;

pub use assembler::{AssembledMessage, AssemblerState, ChoiceAssembler};
pub use links::{LinkAction, resolve_link};
pub use session::{ConversationSession, FAILURE_NOTICE, SubmitState};
pub use viewer::{DocumentViewer, ViewedDocument};
