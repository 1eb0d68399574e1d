pub mod pupil;
