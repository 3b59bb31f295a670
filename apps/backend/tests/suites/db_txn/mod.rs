mod locking;
