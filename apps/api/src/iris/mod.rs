// Iris rendering: pupil measurement, prompt composition, pupil overlay and the
// request pipeline that ties them to the external image generator.
// All provider calls go through image_client.

pub mod handlers;
pub mod measurement;
pub mod overlay;
pub mod pipeline;
pub mod prompts;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;
