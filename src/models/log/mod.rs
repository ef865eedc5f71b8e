pub mod delivery_record;
