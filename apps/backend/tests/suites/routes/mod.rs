mod drafts;
mod health;
