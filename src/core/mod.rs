//! Core conversion implementations

pub mod latex2mdx;
