mod guard;
mod operations;
mod reaper;
