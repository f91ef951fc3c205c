//! Output generation for a run's content batch.
//!
//! Each run writes into one dated, versioned batch directory:
//!
//! ```text
//! contenido/
//! └── 2025-08-25[_Vn]/
//!     ├── news.json          # manifest of successfully processed articles
//!     ├── all_captions.txt   # every caption, in processing order
//!     ├── noticia_1/
//!     │   ├── caption.txt
//!     │   ├── description.txt
//!     │   └── image_<slug>.<ext>   (when the download succeeded)
//!     └── noticia_2/ …
//! ```
//!
//! Batches are immutable once a run completes; a second run on the same day
//! allocates `_V1`, `_V2`, … instead of touching an existing directory.

pub mod batch;
pub mod manifest;
