/// Return this error from a VU's behaviour function to indicate that the VU is bailing.
///
/// This should be used when a VU encounters an error that is fatal to that VU but not
/// necessarily to the scenario. For example, if the target refuses further connections from
/// one VU then that VU may bail while the scenario continues with the other VUs.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct VuBailError {
    msg: String,
}

impl Default for VuBailError {
    fn default() -> Self {
        Self {
            msg: "VU is bailing".to_string(),
        }
    }
}
