/*!
    run micropython test programs on a device and report their outcome

    programs are plain files, by default taken from the [PROGRAMS](suite::PROGRAMS) directory of this package. A program passes when it runs to its end without raising.
*/

pub mod suite;

pub use suite::{Program, Report, Verdict};
