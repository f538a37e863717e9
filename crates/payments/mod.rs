pub mod mpesa_client;
