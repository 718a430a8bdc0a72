//! # single_transfer
//!
//! Transfer Component Analysis (TCA) and Joint Distribution Adaptation (JDA):
//! learn a shared latent space in which labeled source samples and unlabeled
//! target samples are statistically aligned, so a nearest-neighbour classifier
//! trained on the source carries over to the target.
//!
//! All computation is batch and in-memory. The discrepancy, centering and
//! kernel matrices are dense in the total sample count `n = ns + nt`, which
//! bounds practical problem sizes at O(n²) memory and O(n³) time for the
//! eigensolve.
//!
//! ```no_run
//! use ndarray::array;
//! use single_transfer::{Kernel, TcaBuilder};
//!
//! let xs = array![[1.0, 0.1], [0.9, 0.2], [0.1, 1.0], [0.2, 0.9]];
//! let ys = array![1, 1, 2, 2];
//! let xt = array![[1.2, 0.4], [0.3, 1.1]];
//! let yt = array![1, 2];
//!
//! let tca = TcaBuilder::new().kernel(Kernel::Linear).dim(2).build()?;
//! let prediction = tca.fit_predict(xs.view(), ys.view(), xt.view(), yt.view())?;
//! println!("accuracy: {}", prediction.accuracy);
//! # Ok::<(), single_transfer::TransferError>(())
//! ```

pub mod classifier;
mod dense;
pub mod discrepancy;
pub mod eigen;
mod error;
pub mod jda;
pub mod kernel;
pub mod projection;
pub mod split;
pub mod subspace;
pub mod tca;
mod utils;

pub use classifier::{accuracy_score, Classifier, DefaultClassifier, NearestNeighbor, Prediction};
#[cfg(feature = "smartcore")]
pub use classifier::KnnClassifier;
pub use eigen::{CholeskySolver, EigenOrder, EigenSolver};
#[cfg(feature = "lapack")]
pub use eigen::LapackSolver;
pub use error::{Result, TransferError};
pub use jda::{Jda, JdaBuilder, JdaReport};
pub use kernel::{Kernel, DEFAULT_GAMMA};
pub use tca::{Tca, TcaBuilder};
pub use utils::Direction;
pub use utils::FrobeniusNorm;
pub use utils::UnitNorm;
pub use utils::ZeroNorm;
