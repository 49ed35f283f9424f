//! Cortical Learning Algorithm
//!
//! The default collaborators of the detector are an implementation of the
//! algorithm described in
//! [Numenta's paper from 2011](http://numenta.org/resources/HTM_CorticalLearningAlgorithms.pdf),
//! following the later refinements of the NuPIC and htm.core projects: global
//! inhibition with boosting for the pattern analysis, and cells growing
//! distal segments towards the previous winner cells for the transition
//! analysis.

mod pattern;
mod transition;

pub use self::pattern::PatternMemory;
pub use self::transition::TransitionMemory;
