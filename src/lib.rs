//! Reads multiple-choice answer sheets and grades them.
//!
//! A [`template::SheetTemplate`] says where every bubble is sampled. The
//! detector measures how much ink each bubble window holds on a
//! [`image_utils::BinarizedImage`] and picks at most one option per question;
//! the scorer compares those answers with an [`answers::AnswerKey`].

pub mod answers;
pub mod debug;
pub mod detect;
pub mod geometry;
pub mod image_utils;
pub mod interpret;
pub mod persist;
pub mod score;
pub mod template;
#[cfg(test)]
mod test_utils;
pub mod types;
