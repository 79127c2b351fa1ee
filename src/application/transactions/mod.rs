pub mod trash_transaction;
