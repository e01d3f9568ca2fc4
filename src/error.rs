// Error types shared by the viewer modules

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// The coordinator needs at least one slot to display
    #[error("cannot start the viewer without any images")]
    EmptyImageSet,

    /// None of the command line arguments produced a usable file
    #[error("none of the specified paths could be used: {0:?}")]
    NoImages(Vec<PathBuf>),
}
