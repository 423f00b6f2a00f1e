mod network_event;
