mod picks;
mod queue;
mod ticker;
