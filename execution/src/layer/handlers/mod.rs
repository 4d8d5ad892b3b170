mod settle;
mod swap;
mod transfer;
mod vote;
