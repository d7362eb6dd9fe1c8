mod input;
mod lifecycle;
mod output;
